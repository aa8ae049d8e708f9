//! Terminal rendering of controller state: the synchronized URL, the result
//! page, filter options and suggestions.

use crate::error::SearchError;
use crate::filter::FieldSet;
use crate::fixture::CredentialRecord;
use crate::search::query::ListResult;
use crate::typeahead::Suggestion;
use std::io::{self, Write};
use termcolor::{Color, ColorChoice, ColorSpec, StandardStream, WriteColor};

/// Stdout stream honoring the color flag
pub fn stdout(color: bool) -> StandardStream {
    let choice = if color {
        ColorChoice::Auto
    } else {
        ColorChoice::Never
    };
    StandardStream::stdout(choice)
}

/// Print the address bar after synchronization
pub fn print_url<W: WriteColor>(out: &mut W, url: &str) -> io::Result<()> {
    out.set_color(ColorSpec::new().set_fg(Some(Color::Cyan)))?;
    write!(out, "url")?;
    out.reset()?;
    writeln!(out, " {}", url)
}

/// Print a result page with its position in the full result set
pub fn print_results<W: WriteColor>(
    out: &mut W,
    result: &ListResult<CredentialRecord>,
    page_size: u32,
) -> io::Result<()> {
    let Some(range) = result.range(page_size) else {
        out.set_color(ColorSpec::new().set_fg(Some(Color::Yellow)))?;
        writeln!(out, "No results (page {})", result.page)?;
        out.reset()?;
        return Ok(());
    };

    out.set_color(ColorSpec::new().set_bold(true))?;
    write!(out, "{}", range)?;
    out.reset()?;
    writeln!(out, " (page {})", result.page)?;

    for record in &result.data {
        out.set_color(ColorSpec::new().set_fg(Some(Color::Green)))?;
        write!(out, "{:>6}", record.id)?;
        out.reset()?;
        write!(out, "  {}", record.name)?;

        out.set_color(ColorSpec::new().set_fg(Some(Color::Magenta)))?;
        write!(out, "  [{}]", record.entity_type)?;
        out.reset()?;
        write!(out, " issuer {}", record.issuer_id)?;

        if record.inactive {
            out.set_color(ColorSpec::new().set_fg(Some(Color::Red)))?;
            write!(out, " (inactive)")?;
            out.reset()?;
        }
        writeln!(out)?;
    }

    if result.has_next(page_size) {
        writeln!(out, "-- more results on page {} --", result.page.saturating_add(1))?;
    }
    Ok(())
}

/// Print the selectable options of every visible field that has any
pub fn print_options<W: WriteColor>(out: &mut W, fields: &FieldSet) -> io::Result<()> {
    for spec in fields.specs().filter(|spec| !spec.hidden) {
        let options = fields.options(&spec.name);
        if options.is_empty() {
            continue;
        }

        out.set_color(ColorSpec::new().set_fg(Some(Color::Magenta)).set_bold(true))?;
        writeln!(out, "{}", spec.name)?;
        out.reset()?;

        let selected = fields.get_field_value(&spec.name);
        for option in options {
            let marker = if selected == Some(option.value.as_str()) { '*' } else { ' ' };
            writeln!(out, "  {} {}", marker, option.label)?;
        }
    }
    Ok(())
}

pub fn print_suggestions<W: WriteColor>(
    out: &mut W,
    term: &str,
    suggestions: &[Suggestion],
) -> io::Result<()> {
    out.set_color(ColorSpec::new().set_fg(Some(Color::Cyan)))?;
    write!(out, "{:?}", term)?;
    out.reset()?;

    if suggestions.is_empty() {
        return writeln!(out, " -> (none)");
    }
    let terms: Vec<&str> = suggestions.iter().map(|s| s.term.as_str()).collect();
    writeln!(out, " -> {}", terms.join(", "))
}

/// Print a user-facing error line
pub fn print_error<W: WriteColor>(out: &mut W, err: &SearchError) -> io::Result<()> {
    out.set_color(ColorSpec::new().set_fg(Some(Color::Red)).set_bold(true))?;
    write!(out, "error")?;
    out.reset()?;
    writeln!(out, ": {}", err)
}
