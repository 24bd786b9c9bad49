use std::io::{self, IsTerminal, Write};

use anyhow::anyhow;
use chrono::{DateTime, Datelike, NaiveDate, Utc};
use unicode_width::UnicodeWidthStr;

use crate::calendar::CalendarEvent;
use crate::category::Category;
use crate::config::Config;
use crate::datetime::{format_local, local_day};
use crate::task::{Priority, Status, Task};

/// Terminal presentation collaborator. The core hands it data; it never
/// hands state back.
#[derive(Debug, Clone)]
pub struct Renderer {
    color: bool,
}

impl Renderer {
    pub fn new(cfg: &Config) -> anyhow::Result<Self> {
        let color_cfg = cfg.get("color").unwrap_or_else(|| "on".to_string());
        let color = match color_cfg.to_ascii_lowercase().as_str() {
            "on" | "yes" | "true" | "1" => true,
            "off" | "no" | "false" | "0" => false,
            other => return Err(anyhow!("invalid color setting: {other}")),
        };

        Ok(Self { color })
    }

    #[tracing::instrument(skip(self, columns, now))]
    pub fn print_board(
        &mut self,
        columns: &[(Status, Vec<&Task>)],
        now: DateTime<Utc>,
    ) -> anyhow::Result<()> {
        let mut out = io::stdout().lock();

        let headers: Vec<String> = columns
            .iter()
            .map(|(status, tasks)| format!("{} ({})", status.column_title(), tasks.len()))
            .collect();

        let depth = columns.iter().map(|(_, tasks)| tasks.len()).max().unwrap_or(0);
        let mut rows = Vec::with_capacity(depth);
        for i in 0..depth {
            let row: Vec<String> = columns
                .iter()
                .map(|(_, tasks)| {
                    tasks
                        .get(i)
                        .map(|task| self.card_line(task, now))
                        .unwrap_or_default()
                })
                .collect();
            rows.push(row);
        }

        write_table(&mut out, &headers, &rows)
    }

    #[tracing::instrument(skip(self, tasks, now))]
    pub fn print_task_table(&mut self, tasks: &[&Task], now: DateTime<Utc>) -> anyhow::Result<()> {
        let mut out = io::stdout().lock();

        let headers: Vec<String> = ["ID", "Status", "Due", "Priority", "Category", "Title"]
            .into_iter()
            .map(str::to_string)
            .collect();

        let mut rows = Vec::with_capacity(tasks.len());
        for task in tasks {
            let id = self.paint(&short_id(task), "33");

            let due = match task.due_date {
                Some(due) if due < now => self.paint(&format_local(due), "31"),
                Some(due) => format_local(due),
                None => String::new(),
            };

            rows.push(vec![
                id,
                task.status.to_string(),
                due,
                task.priority.to_string(),
                task.category.clone(),
                task.title.clone(),
            ]);
        }

        write_table(&mut out, &headers, &rows)
    }

    #[tracing::instrument(skip(self, task, known_categories))]
    pub fn print_task_info(
        &mut self,
        task: &Task,
        known_categories: &[Category],
    ) -> anyhow::Result<()> {
        let mut out = io::stdout().lock();

        writeln!(out, "id          {}", task.id)?;
        writeln!(out, "title       {}", task.title)?;
        writeln!(out, "description {}", task.description)?;
        writeln!(out, "status      {}", task.status)?;
        writeln!(out, "category    {}", task.effective_category(known_categories))?;
        writeln!(out, "priority    {}", task.priority)?;
        writeln!(out, "recurrence  {}", task.recurrence)?;
        if let Some(due) = task.due_date {
            writeln!(out, "due         {}", format_local(due))?;
        }
        writeln!(out, "created     {}", format_local(task.created_at))?;
        writeln!(out, "order       {}", task.order_index)?;

        if !task.attachments.is_empty() {
            writeln!(out, "attachments {}", task.attachments.len())?;
            for attachment in &task.attachments {
                writeln!(
                    out,
                    "  - {} ({}, {} bytes encoded)",
                    attachment.name,
                    attachment.mime_type,
                    attachment.data.len()
                )?;
            }
        }

        Ok(())
    }

    #[tracing::instrument(skip(self, entries))]
    pub fn print_categories(&mut self, entries: &[(Category, usize)]) -> anyhow::Result<()> {
        let mut out = io::stdout().lock();

        for (category, count) in entries {
            let swatch = match parse_hex_color(&category.color) {
                Some(rgb) => self.paint_rgb("■", rgb),
                None => "■".to_string(),
            };
            writeln!(out, "{swatch} {:<16} {count} task(s)", category.name)?;
        }

        Ok(())
    }

    #[tracing::instrument(skip(self, events))]
    pub fn print_calendar(
        &mut self,
        year: i32,
        month: u32,
        events: &[CalendarEvent],
    ) -> anyhow::Result<()> {
        let first =
            NaiveDate::from_ymd_opt(year, month, 1).ok_or_else(|| anyhow!("invalid month"))?;
        let mut out = io::stdout().lock();

        writeln!(out, "{}", first.format("%B %Y"))?;
        writeln!(out, "Mo Tu We Th Fr Sa Su")?;

        let mut month_events: Vec<(u32, &CalendarEvent)> = events
            .iter()
            .filter_map(|event| {
                let day = local_day(event.start);
                (day.year() == year && day.month() == month).then_some((day.day(), event))
            })
            .collect();
        month_events.sort_by_key(|(day, _)| *day);

        let lead = first.weekday().num_days_from_monday();
        let days = days_in_month(year, month);

        let mut cells: Vec<String> = vec!["  ".to_string(); lead as usize];
        for day in 1..=days {
            let cell = format!("{day:>2}");
            if month_events.iter().any(|(d, _)| *d == day) {
                cells.push(self.paint(&cell, "1;36"));
            } else {
                cells.push(cell);
            }
        }

        for week in cells.chunks(7) {
            writeln!(out, "{}", week.join(" "))?;
        }

        if !month_events.is_empty() {
            writeln!(out)?;
            for (day, event) in &month_events {
                let title = match parse_hex_color(event.color) {
                    Some(rgb) => self.paint_rgb(&event.title, rgb),
                    None => event.title.clone(),
                };
                writeln!(out, "  {day:>2}  {title}")?;
            }
        }

        Ok(())
    }

    fn card_line(&self, task: &Task, now: DateTime<Utc>) -> String {
        let id = self.paint(&short_id(task), "33");
        let title = if task.title.is_empty() {
            "(untitled)".to_string()
        } else {
            task.title.clone()
        };
        let title = self.paint(&title, priority_code(task.priority));

        let overdue = task.due_date.is_some_and(|due| due < now);
        if overdue {
            format!("{id} {title} {}", self.paint("!", "31"))
        } else {
            format!("{id} {title}")
        }
    }

    fn paint(&self, text: &str, code: &str) -> String {
        if !self.color || !io::stdout().is_terminal() {
            return text.to_string();
        }
        format!("\x1b[{code}m{text}\x1b[0m")
    }

    fn paint_rgb(&self, text: &str, (r, g, b): (u8, u8, u8)) -> String {
        if !self.color || !io::stdout().is_terminal() {
            return text.to_string();
        }
        format!("\x1b[38;2;{r};{g};{b}m{text}\x1b[0m")
    }
}

fn priority_code(priority: Priority) -> &'static str {
    match priority {
        Priority::High => "31",
        Priority::Medium => "33",
        Priority::Low => "32",
    }
}

fn short_id(task: &Task) -> String {
    task.id.to_string().chars().take(8).collect()
}

fn days_in_month(year: i32, month: u32) -> u32 {
    let (next_year, next_month) = if month == 12 {
        (year + 1, 1)
    } else {
        (year, month + 1)
    };
    NaiveDate::from_ymd_opt(next_year, next_month, 1)
        .and_then(|d| d.pred_opt())
        .map(|d| d.day())
        .unwrap_or(30)
}

fn write_table<W: Write>(
    mut writer: W,
    headers: &[String],
    rows: &[Vec<String>],
) -> anyhow::Result<()> {
    let column_count = headers.len();
    let mut widths = vec![0usize; column_count];

    for (idx, header) in headers.iter().enumerate() {
        widths[idx] = widths[idx].max(UnicodeWidthStr::width(header.as_str()));
    }
    for row in rows {
        for (idx, cell) in row.iter().enumerate() {
            widths[idx] = widths[idx].max(UnicodeWidthStr::width(strip_ansi(cell).as_str()));
        }
    }

    for (idx, header) in headers.iter().enumerate() {
        write!(writer, "{:width$}  ", header, width = widths[idx])?;
    }
    writeln!(writer)?;

    for width in widths.iter().copied() {
        write!(writer, "{:-<width$}  ", "")?;
    }
    writeln!(writer)?;

    for row in rows {
        for (idx, cell) in row.iter().enumerate() {
            let visible = UnicodeWidthStr::width(strip_ansi(cell).as_str());
            let padding = widths[idx].saturating_sub(visible);
            write!(writer, "{}{}  ", cell, " ".repeat(padding))?;
        }
        writeln!(writer)?;
    }

    Ok(())
}

fn strip_ansi(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut escaped = false;

    for ch in s.chars() {
        if escaped {
            if ch == 'm' {
                escaped = false;
            }
            continue;
        }
        if ch == '\x1b' {
            escaped = true;
            continue;
        }
        out.push(ch);
    }

    out
}

fn parse_hex_color(raw: &str) -> Option<(u8, u8, u8)> {
    let hex = raw.trim().strip_prefix('#')?;
    if hex.len() != 6 {
        return None;
    }
    let r = u8::from_str_radix(&hex[0..2], 16).ok()?;
    let g = u8::from_str_radix(&hex[2..4], 16).ok()?;
    let b = u8::from_str_radix(&hex[4..6], 16).ok()?;
    Some((r, g, b))
}

#[cfg(test)]
mod tests {
    use super::{days_in_month, parse_hex_color, strip_ansi};

    #[test]
    fn hex_colors_parse_or_bail() {
        assert_eq!(parse_hex_color("#ff0000"), Some((255, 0, 0)));
        assert_eq!(parse_hex_color("#44ff44"), Some((68, 255, 68)));
        assert_eq!(parse_hex_color("red"), None);
        assert_eq!(parse_hex_color("#fff"), None);
    }

    #[test]
    fn month_lengths_account_for_leap_years() {
        assert_eq!(days_in_month(2026, 8), 31);
        assert_eq!(days_in_month(2026, 2), 28);
        assert_eq!(days_in_month(2028, 2), 29);
        assert_eq!(days_in_month(2026, 12), 31);
    }

    #[test]
    fn ansi_stripping_leaves_plain_text() {
        assert_eq!(strip_ansi("\x1b[31mdanger\x1b[0m"), "danger");
        assert_eq!(strip_ansi("plain"), "plain");
    }
}
