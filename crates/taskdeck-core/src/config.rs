use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, anyhow};
use tracing::{debug, info, trace, warn};

/// Layered key=value configuration: built-in defaults, then `~/.deckrc`
/// (or an override file), then `--rc key=value` flags.
#[derive(Debug, Clone)]
pub struct Config {
    map: HashMap<String, String>,
    pub loaded_files: Vec<PathBuf>,
}

impl Config {
    #[tracing::instrument(skip(deckrc_override))]
    pub fn load(deckrc_override: Option<&Path>) -> anyhow::Result<Self> {
        let mut cfg = Config {
            map: HashMap::new(),
            loaded_files: vec![],
        };

        cfg.map
            .insert("data.location".to_string(), "~/.taskdeck".to_string());
        cfg.map
            .insert("default.command".to_string(), "board".to_string());
        cfg.map.insert("color".to_string(), "on".to_string());
        cfg.map
            .insert("reminder.interval.secs".to_string(), "60".to_string());
        cfg.map
            .insert("reminder.lookahead.secs".to_string(), "300".to_string());

        let deckrc = resolve_deckrc_path(deckrc_override)?;
        if let Some(path) = deckrc {
            info!(deckrc = %path.display(), "loading deckrc");
            cfg.load_file(&path)?;
        } else {
            debug!("no deckrc found; using defaults");
        }

        Ok(cfg)
    }

    #[tracing::instrument(skip(self, overrides))]
    pub fn apply_overrides<I>(&mut self, overrides: I)
    where
        I: IntoIterator<Item = (String, String)>,
    {
        for (k, v) in overrides {
            debug!(key = %k, value = %v, "applying override");
            self.map.insert(k, v);
        }
    }

    pub fn get(&self, key: &str) -> Option<String> {
        self.map.get(key).cloned()
    }

    pub fn get_bool(&self, key: &str) -> Option<bool> {
        self.map.get(key).map(|v| parse_bool(v))
    }

    pub fn get_u64(&self, key: &str) -> Option<u64> {
        let raw = self.map.get(key)?;
        match raw.trim().parse() {
            Ok(value) => Some(value),
            Err(_) => {
                warn!(key, value = %raw, "ignoring non-numeric config value");
                None
            }
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &String)> {
        self.map.iter()
    }

    #[tracing::instrument(skip(self))]
    fn load_file(&mut self, path: &Path) -> anyhow::Result<()> {
        let path = expand_tilde(path);
        let text = fs::read_to_string(&path)
            .with_context(|| format!("failed to read {}", path.display()))?;

        self.loaded_files.push(path.clone());

        let base_dir = path
            .parent()
            .map(|p| p.to_path_buf())
            .unwrap_or_else(|| PathBuf::from("."));

        for (line_num, raw_line) in text.lines().enumerate() {
            let mut line = raw_line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }

            if let Some((before, _)) = line.split_once('#') {
                line = before.trim();
            }
            if line.is_empty() {
                continue;
            }

            if let Some(include_rest) = line.strip_prefix("include ") {
                let include_path = resolve_include_path(&base_dir, include_rest.trim())?;
                if include_path.exists() {
                    self.load_file(&include_path)?;
                } else {
                    warn!(include = %include_path.display(), "include file does not exist; skipping");
                }
                continue;
            }

            let (k, v) = line.split_once('=').ok_or_else(|| {
                anyhow!(
                    "invalid config line {}:{}: {}",
                    path.display(),
                    line_num + 1,
                    raw_line
                )
            })?;

            let key = k.trim().to_string();
            let value = v.trim().to_string();
            trace!(key = %key, value = %value, "loaded config key");
            self.map.insert(key, value);
        }

        Ok(())
    }
}

#[tracing::instrument(skip(cfg, override_dir))]
pub fn resolve_data_dir(cfg: &Config, override_dir: Option<&Path>) -> anyhow::Result<PathBuf> {
    let dir = if let Some(path) = override_dir {
        path.to_path_buf()
    } else if let Some(cfg_value) = cfg.get("data.location") {
        expand_tilde(Path::new(&cfg_value))
    } else {
        default_data_dir()?
    };

    if !dir.exists() {
        info!(dir = %dir.display(), "creating data directory");
        fs::create_dir_all(&dir)
            .with_context(|| format!("failed to create {}", dir.display()))?;
    }

    Ok(dir)
}

#[tracing::instrument(skip(override_path))]
fn resolve_deckrc_path(override_path: Option<&Path>) -> anyhow::Result<Option<PathBuf>> {
    if let Some(path) = override_path {
        return Ok(Some(path.to_path_buf()));
    }

    if let Ok(deckrc_env) = std::env::var("DECKRC") {
        if deckrc_env == "/dev/null" {
            return Ok(None);
        }
        return Ok(Some(PathBuf::from(deckrc_env)));
    }

    let home = dirs::home_dir().ok_or_else(|| anyhow!("cannot determine home directory"))?;
    let candidate = home.join(".deckrc");
    if candidate.exists() {
        return Ok(Some(candidate));
    }

    Ok(None)
}

fn default_data_dir() -> anyhow::Result<PathBuf> {
    let home = dirs::home_dir().ok_or_else(|| anyhow!("cannot determine home directory"))?;
    Ok(home.join(".taskdeck"))
}

fn resolve_include_path(base_dir: &Path, include: &str) -> anyhow::Result<PathBuf> {
    if include.trim().is_empty() {
        return Err(anyhow!("include path cannot be empty"));
    }

    let expanded = expand_tilde(Path::new(include));
    if expanded.is_absolute() {
        Ok(expanded)
    } else {
        Ok(base_dir.join(expanded))
    }
}

fn expand_tilde(path: &Path) -> PathBuf {
    let text = path.to_string_lossy();
    if let Some(rest) = text.strip_prefix("~/")
        && let Some(home) = dirs::home_dir()
    {
        return home.join(rest);
    }
    path.to_path_buf()
}

fn parse_bool(s: &str) -> bool {
    matches!(
        s.trim().to_ascii_lowercase().as_str(),
        "1" | "y" | "yes" | "on" | "true"
    )
}

#[cfg(test)]
mod tests {
    use std::fs;

    use tempfile::tempdir;

    use super::Config;

    #[test]
    fn defaults_cover_the_reminder_knobs() {
        let temp = tempdir().expect("tempdir");
        let empty = temp.path().join("deckrc");
        fs::write(&empty, "").expect("write rc");

        let cfg = Config::load(Some(&empty)).expect("load");
        assert_eq!(cfg.get_u64("reminder.interval.secs"), Some(60));
        assert_eq!(cfg.get_u64("reminder.lookahead.secs"), Some(300));
        assert_eq!(cfg.get("default.command").as_deref(), Some("board"));
        assert_eq!(cfg.get_bool("color"), Some(true));
    }

    #[test]
    fn rc_file_and_overrides_layer_in_order() {
        let temp = tempdir().expect("tempdir");
        let rc = temp.path().join("deckrc");
        fs::write(
            &rc,
            "# comment\ncolor = off\nreminder.interval.secs = 15  # trailing note\n",
        )
        .expect("write rc");

        let mut cfg = Config::load(Some(&rc)).expect("load");
        assert_eq!(cfg.get_bool("color"), Some(false));
        assert_eq!(cfg.get_u64("reminder.interval.secs"), Some(15));

        cfg.apply_overrides([("color".to_string(), "on".to_string())]);
        assert_eq!(cfg.get_bool("color"), Some(true));
    }

    #[test]
    fn includes_pull_in_sibling_files() {
        let temp = tempdir().expect("tempdir");
        let extra = temp.path().join("extra.rc");
        fs::write(&extra, "default.command = list\n").expect("write extra");
        let rc = temp.path().join("deckrc");
        fs::write(&rc, "include extra.rc\n").expect("write rc");

        let cfg = Config::load(Some(&rc)).expect("load");
        assert_eq!(cfg.get("default.command").as_deref(), Some("list"));
        assert_eq!(cfg.loaded_files.len(), 2);
    }

    #[test]
    fn invalid_numbers_fall_back_to_none() {
        let temp = tempdir().expect("tempdir");
        let rc = temp.path().join("deckrc");
        fs::write(&rc, "reminder.interval.secs = soon\n").expect("write rc");

        let cfg = Config::load(Some(&rc)).expect("load");
        assert_eq!(cfg.get_u64("reminder.interval.secs"), None);
    }
}
