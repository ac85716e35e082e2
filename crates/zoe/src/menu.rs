//! Numbered terminal menus used at startup.

use std::io::{self, Write};

use tokio::io::{AsyncBufRead, AsyncBufReadExt};

/// Reads one line, `None` at end of input.
pub async fn read_line<R>(input: &mut R) -> io::Result<Option<String>>
where
    R: AsyncBufRead + Unpin,
{
    let mut line = String::new();
    if input.read_line(&mut line).await? == 0 {
        return Ok(None);
    }
    Ok(Some(line.trim().to_owned()))
}

fn print_options<W: Write>(
    output: &mut W,
    message: &str,
    options: &[&str],
) -> io::Result<()> {
    writeln!(output, "{message}")?;
    for (idx, option) in options.iter().enumerate() {
        writeln!(output, "  {}) {option}", idx + 1)?;
    }
    Ok(())
}

fn parse_choice(text: &str, count: usize) -> Option<usize> {
    let choice: usize = text.parse().ok()?;
    (1..=count).contains(&choice).then(|| choice - 1)
}

/// Asks for one of `options` until a valid number is entered.
///
/// Returns the index of the choice, `None` if the input ends first.
pub async fn select_one<R, W>(
    input: &mut R,
    output: &mut W,
    message: &str,
    options: &[&str],
) -> io::Result<Option<usize>>
where
    R: AsyncBufRead + Unpin,
    W: Write,
{
    print_options(output, message, options)?;
    loop {
        write!(output, "> ")?;
        output.flush()?;
        let Some(line) = read_line(input).await? else {
            return Ok(None);
        };
        match parse_choice(&line, options.len()) {
            Some(idx) => return Ok(Some(idx)),
            None => writeln!(output, "Enter a number from 1 to {}", options.len())?,
        }
    }
}

/// Asks for any number of `options`, entered as numbers separated by
/// commas or spaces. An empty line selects nothing.
///
/// Returns the indices in menu order without duplicates, `None` if the
/// input ends first.
pub async fn select_many<R, W>(
    input: &mut R,
    output: &mut W,
    message: &str,
    options: &[&str],
) -> io::Result<Option<Vec<usize>>>
where
    R: AsyncBufRead + Unpin,
    W: Write,
{
    print_options(output, message, options)?;
    'prompt: loop {
        write!(output, "> ")?;
        output.flush()?;
        let Some(line) = read_line(input).await? else {
            return Ok(None);
        };

        let mut chosen = vec![false; options.len()];
        for part in line.split([',', ' ']).filter(|p| !p.is_empty()) {
            let Some(idx) = parse_choice(part, options.len()) else {
                writeln!(output, "`{part}` is not an option")?;
                continue 'prompt;
            };
            chosen[idx] = true;
        }
        let indices = chosen
            .iter()
            .enumerate()
            .filter_map(|(idx, chosen)| chosen.then_some(idx))
            .collect();
        return Ok(Some(indices));
    }
}
