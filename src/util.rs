use std::io::{self, Write};

use imdb_search::{Arity, Error, SearchResult, DIRECTIVES};
use tabwriter::TabWriter;

use crate::Result;

/// Ask the end user to choose among several candidates.
///
/// The candidates are printed as a table followed by a prompt. An empty
/// answer chooses nothing. An invalid answer (or a problem talking to the
/// terminal) aborts the search that asked.
pub fn choose(
    results: &[SearchResult],
    what: &str,
) -> imdb_search::Result<Option<SearchResult>> {
    let prompt = || -> Result<Option<usize>> {
        let mut stdout = io::stdout();
        writeln!(stdout, "Several {} candidates match:", what)?;
        write_tsv(&mut stdout, results)?;
        read_number(1, results.len())
    };
    match prompt() {
        Ok(None) => Ok(None),
        Ok(Some(choice)) => Ok(Some(results[choice - 1].clone())),
        Err(err) => Err(Error::chooser(format!("{:#}", err))),
    }
}

/// Reads a number from stdin in the given inclusive range. An empty response
/// yields `None`.
pub fn read_number(start: usize, end: usize) -> Result<Option<usize>> {
    let mut stdout = io::stdout();
    write!(stdout, "Please enter your choice [{}-{}]: ", start, end)?;
    stdout.flush()?;

    let mut response = String::new();
    io::stdin().read_line(&mut response)?;
    let response = response.trim();
    if response.is_empty() {
        return Ok(None);
    }
    let choice: usize = response.parse()?;
    if choice < start || choice > end {
        anyhow::bail!(
            "invalid choice: {} is not in range [{}-{}]",
            choice,
            start,
            end
        );
    }
    Ok(Some(choice))
}

/// Write the given results to the given writer as an aligned table.
pub fn write_tsv<W: io::Write>(wtr: W, results: &[SearchResult]) -> Result<()> {
    let mut wtr = TabWriter::new(wtr).minwidth(4);
    writeln!(wtr, "#\tsim\tid\tkind\tname\tyear\tvotes\trank\tinfo")?;
    for (i, r) in results.iter().enumerate() {
        let sim = if r.has_similarity() {
            format!("{:0.3}", r.similarity)
        } else {
            "-".to_string()
        };
        let year =
            if r.year > 0 { r.year.to_string() } else { "N/A".to_string() };
        let mut info = r.attrs.clone();
        if let Some(ref credit) = r.credit {
            if !info.is_empty() {
                info.push(' ');
            }
            info.push_str(&format!("[{}]", credit.character));
            if let Some(pos) = credit.position {
                info.push_str(&format!(" <{}>", pos));
            }
            if !credit.attrs.is_empty() {
                info.push(' ');
                info.push_str(&credit.attrs);
            }
        }
        writeln!(
            wtr,
            "{}\t{}\t{}\t{}\t{}\t{}\t{}\t{}\t{}",
            i + 1,
            sim,
            r.id,
            r.entity,
            r.name,
            year,
            r.rank.votes,
            r.rank.rank,
            info,
        )?;
    }
    wtr.flush()?;
    Ok(())
}

/// Write each of the given results as a line of JSON.
pub fn write_json<W: io::Write>(
    mut wtr: W,
    results: &[SearchResult],
) -> Result<()> {
    for r in results {
        serde_json::to_writer(&mut wtr, r)?;
        wtr.write_all(b"\n")?;
    }
    wtr.flush()?;
    Ok(())
}

/// Write a table of every query directive.
pub fn write_directives<W: io::Write>(wtr: W) -> Result<()> {
    let mut wtr = TabWriter::new(wtr).minwidth(4);
    writeln!(wtr, "directive\tsynonyms\tdescription")?;
    for d in DIRECTIVES {
        let synonyms: Vec<String> = d
            .synonyms()
            .iter()
            .map(|syn| match d.arity() {
                Arity::None => format!("{{{}}}", syn),
                Arity::Required(_) => format!("{{{}:...}}", syn),
            })
            .collect();
        writeln!(
            wtr,
            "{}\t{}\t{}",
            d.usage(),
            synonyms.join(" "),
            d.description()
        )?;
    }
    wtr.flush()?;
    Ok(())
}
