/// Splits SPARQL text into coarse tokens for delta debugging.
///
/// The granularity is deliberately rough: IRIs and string literals stay
/// intact (they may contain spaces and delimiters), comments vanish, and
/// everything else splits on whitespace. That matches the serializer this
/// crate shrinks against, which always puts whitespace around punctuation.
pub fn tokenize(text: &str) -> Vec<String> {
    let mut tokens = Vec::new();
    let mut chars = text.chars().peekable();
    while let Some(&c) = chars.peek() {
        if c.is_whitespace() {
            chars.next();
        } else if c == '#' {
            for next in chars.by_ref() {
                if next == '\n' {
                    break;
                }
            }
        } else if c == '<' {
            tokens.push(read_until(&mut chars, '>'));
        } else if c == '"' || c == '\'' {
            tokens.push(read_string(&mut chars, c));
        } else {
            let mut token = String::new();
            while let Some(&next) = chars.peek() {
                if next.is_whitespace() || next == '#' {
                    break;
                }
                token.push(next);
                chars.next();
            }
            tokens.push(token);
        }
    }
    tokens
}

/// Reassembles tokens into SPARQL text.
pub fn join(tokens: &[String]) -> String {
    tokens.join(" ")
}

fn read_until(chars: &mut std::iter::Peekable<std::str::Chars<'_>>, end: char) -> String {
    let mut token = String::new();
    for c in chars.by_ref() {
        token.push(c);
        if c == end {
            break;
        }
    }
    token
}

fn read_string(chars: &mut std::iter::Peekable<std::str::Chars<'_>>, quote: char) -> String {
    let mut token = String::new();
    let mut escaped = false;
    let mut opened = false;
    for c in chars.by_ref() {
        token.push(c);
        if !opened {
            opened = true;
            continue;
        }
        if escaped {
            escaped = false;
        } else if c == '\\' {
            escaped = true;
        } else if c == quote {
            break;
        }
    }
    // A language tag or datatype suffix belongs to the literal token.
    while let Some(&next) = chars.peek() {
        if next.is_whitespace() || next == '#' {
            break;
        }
        token.push(next);
        chars.next();
    }
    token
}
