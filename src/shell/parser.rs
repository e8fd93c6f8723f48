//! A small recursive-descent parser, standing in for the external lexer the
//! original coursework treats as a given collaborator. It understands
//! `|`, `&&`, `||`, a trailing `&`, and a single trailing `>`/`>>`
//! redirection -- enough to drive the executor end to end.

use super::command::{ChainKind, Command, Exe, Pipeline, PipelineCondition};

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ParseError {
    #[error("empty command")]
    Empty,
    #[error("dangling operator {0:?}")]
    DanglingOperator(String),
    #[error("missing filename after redirection")]
    MissingRedirectTarget,
}

/// Parse one full command line (pipelines, `&&`/`||` chaining, trailing `&`,
/// and a single trailing redirection) into a [`Command`].
pub fn parse(line: &str) -> Result<Command, ParseError> {
    let mut tokens: Vec<String> = tokenize(line);
    if tokens.is_empty() {
        return Err(ParseError::Empty);
    }

    let is_bg = if tokens.last().map(String::as_str) == Some("&") {
        tokens.pop();
        true
    } else {
        false
    };

    let (redirect_filename, append) = extract_trailing_redirect(&mut tokens)?;
    if tokens.is_empty() {
        return Err(ParseError::Empty);
    }

    let segments = split_on(&tokens, &["&&", "||"]);
    let mut segments = segments.into_iter();

    let (_, first_tokens) = segments.next().expect("split_on never returns zero segments");
    let first = parse_pipeline(&first_tokens)?;

    let mut chained = Vec::new();
    for (op, seg_tokens) in segments {
        let kind = match op.as_deref() {
            Some("&&") => ChainKind::And,
            Some("||") => ChainKind::Or,
            _ => unreachable!("split_on only tags non-first segments with an operator"),
        };
        let pipeline = parse_pipeline(&seg_tokens)?;
        chained.push(PipelineCondition { kind, pipeline });
    }

    Ok(Command {
        first,
        chained,
        is_bg,
        redirect_filename,
        append,
    })
}

fn parse_pipeline(tokens: &[String]) -> Result<Pipeline, ParseError> {
    let stages = split_on(tokens, &["|"]);
    let mut exes = Vec::with_capacity(stages.len());
    for (_, stage_tokens) in stages {
        exes.push(parse_exe(&stage_tokens)?);
    }

    let mut exes = exes.into_iter();
    let first = exes.next().ok_or(ParseError::Empty)?;
    Ok(Pipeline { first, piped: exes.collect() })
}

fn parse_exe(tokens: &[String]) -> Result<Exe, ParseError> {
    let mut tokens = tokens.iter();
    let name = tokens.next().ok_or(ParseError::Empty)?.clone();
    Ok(Exe::new(name, tokens.cloned().collect()))
}

/// Split `tokens` on any of `ops`, returning `(operator_that_preceded_this_segment, segment)`
/// pairs; the first segment's operator is always `None`.
fn split_on(tokens: &[String], ops: &[&str]) -> Vec<(Option<String>, Vec<String>)> {
    let mut out = Vec::new();
    let mut current = Vec::new();
    let mut pending_op: Option<String> = None;

    for tok in tokens {
        if ops.contains(&tok.as_str()) {
            out.push((pending_op.take(), std::mem::take(&mut current)));
            pending_op = Some(tok.clone());
        } else {
            current.push(tok.clone());
        }
    }
    out.push((pending_op, current));
    out
}

fn extract_trailing_redirect(tokens: &mut Vec<String>) -> Result<(Option<String>, bool), ParseError> {
    for (i, tok) in tokens.iter().enumerate() {
        if tok == ">" || tok == ">>" {
            let append = tok == ">>";
            let filename = tokens
                .get(i + 1)
                .cloned()
                .ok_or(ParseError::MissingRedirectTarget)?;
            if tokens.len() != i + 2 {
                // Redirection must be the last thing in the command.
                return Err(ParseError::DanglingOperator(tok.clone()));
            }
            let target = filename;
            tokens.truncate(i);
            return Ok((Some(target), append));
        }
    }
    Ok((None, false))
}

/// Whitespace tokenizer that keeps `|`, `&&`, `||`, `&`, `>`, `>>` as their
/// own tokens even when glued to neighbouring words (`echo hi|cat`).
fn tokenize(line: &str) -> Vec<String> {
    let mut tokens = Vec::new();
    let mut current = String::new();
    let mut chars = line.chars().peekable();

    macro_rules! flush {
        () => {
            if !current.is_empty() {
                tokens.push(std::mem::take(&mut current));
            }
        };
    }

    while let Some(c) = chars.next() {
        match c {
            c if c.is_whitespace() => flush!(),
            '|' => {
                flush!();
                if chars.peek() == Some(&'|') {
                    chars.next();
                    tokens.push("||".to_string());
                } else {
                    tokens.push("|".to_string());
                }
            }
            '&' => {
                flush!();
                if chars.peek() == Some(&'&') {
                    chars.next();
                    tokens.push("&&".to_string());
                } else {
                    tokens.push("&".to_string());
                }
            }
            '>' => {
                flush!();
                if chars.peek() == Some(&'>') {
                    chars.next();
                    tokens.push(">>".to_string());
                } else {
                    tokens.push(">".to_string());
                }
            }
            c => current.push(c),
        }
    }
    flush!();
    tokens
}
