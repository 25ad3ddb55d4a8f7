//! Parsers for CUPS command-line output. Malformed lines are skipped rather
//! than reported; the spooler's text format is not under our control.

use crate::{PrinterInfo, SpoolerJob};

const NO_PRINTER: &str = "No printer";

/// Parses `lpq -a` output:
///
/// ```text
/// Rank    Owner   Job     File(s)                         Total Size
/// active  ada     210     report.pdf                      155648 bytes
/// 1st     ada     212     notes for monday.txt            1024 bytes
/// ```
pub fn parse_lpq(output: &str) -> Vec<SpoolerJob> {
    output.lines().filter_map(parse_lpq_line).collect()
}

fn parse_lpq_line(line: &str) -> Option<SpoolerJob> {
    let line = line.trim();
    if line.is_empty() || line.starts_with("Rank") {
        return None;
    }
    let parts: Vec<&str> = line.split_whitespace().collect();
    if parts.len() < 5 {
        return None;
    }

    let rank = parts[0];
    if !is_rank(rank) {
        return None;
    }
    let job_id = parts[2];

    let bytes_idx = parts.iter().rposition(|part| *part == "bytes")?;
    if bytes_idx < 4 {
        return None;
    }
    let size_bytes = parts[bytes_idx - 1].parse::<i64>().unwrap_or(0);
    let name = parts[3..bytes_idx - 1].join(" ");
    let display_name = if name.is_empty() {
        format!("Job {job_id}")
    } else {
        name
    };

    Some(SpoolerJob {
        id: job_id.to_string(),
        display_name,
        size_bytes,
        spooler_state: rank.to_string(),
    })
}

fn is_rank(rank: &str) -> bool {
    if rank == "active" {
        return true;
    }
    ["st", "nd", "rd", "th"].iter().any(|suffix| {
        rank.strip_suffix(suffix)
            .is_some_and(|digits| !digits.is_empty() && digits.chars().all(|c| c.is_ascii_digit()))
    })
}

/// Extracts the numeric job id from `lp` output such as
/// `request id is PRINTER-216 (1 file(s))`.
pub fn parse_lp_request_id(output: &str) -> Option<String> {
    let rest = output.split("request id is").nth(1)?;
    let request = rest.split_whitespace().next()?;
    let id = match request.rsplit_once('-') {
        Some((_, suffix)) if !suffix.is_empty() => suffix,
        _ => request,
    };
    Some(id.to_string())
}

/// Reads the printer name and state from `lpstat -p -d`. The last
/// `printer NAME is STATE.` line wins.
pub fn parse_lpstat_printer(output: &str) -> PrinterInfo {
    let mut info = PrinterInfo::default();
    for line in output.lines() {
        if !line.starts_with("printer ") {
            continue;
        }
        let parts: Vec<&str> = line.split_whitespace().collect();
        if parts.len() >= 4 {
            info.name = parts[1].to_string();
            info.status = parts[3].trim_end_matches('.').to_string();
        }
    }
    if info.name.is_empty() {
        info.name = NO_PRINTER.to_string();
    }
    info
}

#[cfg(test)]
mod tests {
    use super::*;

    const LPQ: &str = "\
EPSON_ET_2810_Series is ready and printing
Rank    Owner   Job     File(s)                         Total Size
active  ada     210     report.pdf                      155648 bytes
1st     ada     212     notes for monday.txt            1024 bytes
2nd     bob     213     2048 bytes
no entries
";

    #[test]
    fn lpq_jobs_keep_spooler_order() {
        let jobs = parse_lpq(LPQ);
        let ids: Vec<&str> = jobs.iter().map(|job| job.id.as_str()).collect();
        assert_eq!(ids, vec!["210", "212", "213"]);
        assert_eq!(jobs[0].display_name, "report.pdf");
        assert_eq!(jobs[0].size_bytes, 155_648);
        assert_eq!(jobs[0].spooler_state, "active");
        assert_eq!(jobs[1].display_name, "notes for monday.txt");
        assert_eq!(jobs[1].spooler_state, "1st");
    }

    #[test]
    fn lpq_missing_title_falls_back_to_job_number() {
        let jobs = parse_lpq(LPQ);
        assert_eq!(jobs[2].display_name, "Job 213");
        assert_eq!(jobs[2].size_bytes, 2048);
    }

    #[test]
    fn lpq_ignores_noise() {
        assert!(parse_lpq("").is_empty());
        assert!(parse_lpq("printer is ready\nno entries\n").is_empty());
        assert!(parse_lpq("first ada 1 a.pdf 10 bytes").is_empty());
        assert!(parse_lpq("active ada 1 a.pdf 10 kilobytes").is_empty());
    }

    #[test]
    fn lp_request_id_takes_suffix() {
        assert_eq!(
            parse_lp_request_id("request id is EPSON_ET_2810_Series-216 (1 file(s))\n"),
            Some("216".to_string())
        );
        assert_eq!(
            parse_lp_request_id("request id is 42 (1 file(s))"),
            Some("42".to_string())
        );
        assert_eq!(parse_lp_request_id("lp: Error - no default destination"), None);
    }

    #[test]
    fn lpstat_reads_name_and_state() {
        let output = "printer EPSON_ET_2810_Series is idle.  enabled since Tue 01 Oct\n\
                      system default destination: EPSON_ET_2810_Series\n";
        let info = parse_lpstat_printer(output);
        assert_eq!(info.name, "EPSON_ET_2810_Series");
        assert_eq!(info.status, "idle");

        let none = parse_lpstat_printer("no system default destination\n");
        assert_eq!(none.name, "No printer");
        assert!(none.status.is_empty());
    }
}
