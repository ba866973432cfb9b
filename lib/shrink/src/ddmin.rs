use crate::lexer::join;

/// Classic ddmin over a token list.
///
/// `check` receives candidate text and must say whether it is still
/// interesting; it also enforces the check budget by returning `false` once
/// exhausted, which makes the loop settle on the best candidate so far.
pub(crate) fn ddmin<F>(mut tokens: Vec<String>, check: &mut F) -> Vec<String>
where
    F: FnMut(&str) -> bool,
{
    let mut granularity = 2;
    while tokens.len() >= 2 {
        let chunks = split(&tokens, granularity);
        let mut reduced = false;

        for chunk in &chunks {
            if check(&join(chunk)) {
                tokens = chunk.clone();
                granularity = 2;
                reduced = true;
                break;
            }
        }
        if reduced {
            continue;
        }

        if granularity > 2 {
            for i in 0..chunks.len() {
                let complement: Vec<String> = chunks
                    .iter()
                    .enumerate()
                    .filter(|(j, _)| *j != i)
                    .flat_map(|(_, chunk)| chunk.iter().cloned())
                    .collect();
                if check(&join(&complement)) {
                    tokens = complement;
                    granularity = (granularity - 1).max(2);
                    reduced = true;
                    break;
                }
            }
        }
        if reduced {
            continue;
        }

        if granularity >= tokens.len() {
            break;
        }
        granularity = (granularity * 2).min(tokens.len());
    }
    tokens
}

fn split(tokens: &[String], granularity: usize) -> Vec<Vec<String>> {
    let chunk_size = tokens.len().div_ceil(granularity);
    tokens
        .chunks(chunk_size.max(1))
        .map(<[String]>::to_vec)
        .collect()
}
