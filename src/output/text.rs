//! Human-readable text output.
//!
//! Prints match groups, unmatched files, reference orphans, and per-file
//! errors, followed by a one-block summary. Colors come from yansi and are
//! dropped when the caller disables them globally (`--no-color`).

use std::io::{self, Write};

use bytesize::ByteSize;
use yansi::Paint;

use crate::duplicates::ScanResult;
use crate::error::ExitCode;

/// Renders a [`ScanResult`] as plain text.
#[derive(Debug)]
pub struct TextOutput<'a> {
    result: &'a ScanResult,
    exit_code: ExitCode,
}

impl<'a> TextOutput<'a> {
    /// Create a renderer for a finished run.
    #[must_use]
    pub fn new(result: &'a ScanResult, exit_code: ExitCode) -> Self {
        Self { result, exit_code }
    }

    /// Write the full report.
    ///
    /// # Errors
    ///
    /// Returns any I/O error from the writer.
    pub fn write_to<W: Write>(&self, writer: &mut W) -> io::Result<()> {
        self.write_groups(writer)?;
        self.write_pool_matches(writer)?;
        self.write_unmatched(writer)?;
        self.write_ref_orphans(writer)?;
        self.write_errors(writer)?;
        self.write_summary(writer)
    }

    fn write_groups<W: Write>(&self, w: &mut W) -> io::Result<()> {
        for (i, group) in self.result.matches.iter().enumerate() {
            let size = group.files().next().map_or(0, |e| e.size);
            writeln!(
                w,
                "{} {} ({} members, {} each)",
                format!("Group {}:", i + 1).bold(),
                group.digest.cyan(),
                group.count,
                ByteSize::b(size)
            )?;
            for file in group.files() {
                writeln!(w, "  {}", file.path.display())?;
            }
            for reference in group.references() {
                writeln!(w, "  {} {}", "ref".green(), reference.digest)?;
            }
            writeln!(w)?;
        }
        Ok(())
    }

    fn write_pool_matches<W: Write>(&self, w: &mut W) -> io::Result<()> {
        if self.result.pool_matches.is_empty() {
            return Ok(());
        }
        writeln!(w, "{}", "Pool matches:".bold())?;
        for m in &self.result.pool_matches {
            writeln!(w, "  {} {} == {}", m.path.display(), m.digest.cyan(), m.reference)?;
        }
        writeln!(w)
    }

    fn write_unmatched<W: Write>(&self, w: &mut W) -> io::Result<()> {
        if self.result.unmatched.is_empty() {
            return Ok(());
        }
        writeln!(w, "{}", "Unmatched:".bold())?;
        for entry in &self.result.unmatched {
            writeln!(
                w,
                "  {} {} ({})",
                entry.digest.dim(),
                entry.path.display(),
                ByteSize::b(entry.size)
            )?;
        }
        writeln!(w)
    }

    fn write_ref_orphans<W: Write>(&self, w: &mut W) -> io::Result<()> {
        if self.result.ref_orphans.is_empty() {
            return Ok(());
        }
        writeln!(w, "{}", "References without a matching file:".bold())?;
        for orphan in &self.result.ref_orphans {
            writeln!(w, "  {}", orphan.digest.yellow())?;
        }
        writeln!(w)
    }

    fn write_errors<W: Write>(&self, w: &mut W) -> io::Result<()> {
        if self.result.errors.is_empty() {
            return Ok(());
        }
        writeln!(w, "{}", "Errors:".red().bold())?;
        for err in &self.result.errors {
            writeln!(w, "  {}", err.red())?;
        }
        writeln!(w)
    }

    fn write_summary<W: Write>(&self, w: &mut W) -> io::Result<()> {
        let r = self.result;
        writeln!(
            w,
            "{} {} files ({}) with {} using {} workers in {:.2?}",
            "Digested".bold(),
            r.files_processed,
            ByteSize::b(r.bytes_processed),
            r.algorithm,
            r.workers,
            r.duration
        )?;

        if r.pool_mode {
            let matched = r.matches.iter().map(|g| g.references().count()).sum::<usize>();
            writeln!(
                w,
                "References: {} matched, {} unmatched",
                matched,
                r.ref_orphans.len()
            )?;
        } else if !r.matches.is_empty() {
            writeln!(
                w,
                "{} groups, {} redundant copies, {} reclaimable",
                r.matches.len(),
                r.duplicate_files(),
                ByteSize::b(r.reclaimable_space())
            )?;
        }

        let status = match self.exit_code {
            ExitCode::Success => "matches found".green().to_string(),
            ExitCode::NoMatches => "no matches".yellow().to_string(),
            ExitCode::PartialSuccess => format!("{} files failed", r.errors.len()).red().to_string(),
            ExitCode::Interrupted => "interrupted".red().bold().to_string(),
            ExitCode::GeneralError => "failed".red().bold().to_string(),
        };
        writeln!(w, "Result: {} [{}]", status, self.exit_code.code_prefix())
    }
}
