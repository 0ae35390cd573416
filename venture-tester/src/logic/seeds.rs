use anyhow::{Context, Result, bail};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha20Rng;

/// Largest number of seeds a single token may expand to.
const MAX_EXPANSION: u64 = 10_000;

/// Resolve CLI seed tokens into concrete seeds.
///
/// Accepts literal integers (negative values use their magnitude), ranges
/// `a..b` / `a..=b`, and `random:N` or `random:N@BASE`, which draws `N`
/// seeds from a generator seeded with `BASE` (default 0).
pub fn resolve_seed_inputs(tokens: &[String]) -> Result<Vec<u64>> {
    let mut seeds = Vec::new();
    for token in tokens {
        let token = token.trim();
        if token.is_empty() {
            continue;
        }
        if let Some(request) = token.strip_prefix("random:") {
            seeds.extend(random_seeds(request)?);
        } else if token.contains("..") {
            seeds.extend(range_seeds(token)?);
        } else if let Ok(value) = token.parse::<i64>() {
            seeds.push(value.unsigned_abs());
        } else if let Ok(value) = token.parse::<u64>() {
            seeds.push(value);
        } else {
            bail!("unrecognised seed `{token}`");
        }
    }
    if seeds.is_empty() {
        bail!("no seeds provided");
    }
    Ok(seeds)
}

fn random_seeds(request: &str) -> Result<Vec<u64>> {
    let (count, base) = match request.split_once('@') {
        Some((count, base)) => (count, base.parse::<u64>().context("invalid random base")?),
        None => (request, 0),
    };
    let count: u64 = count.parse().context("invalid random count")?;
    if count > MAX_EXPANSION {
        bail!("random:{count} exceeds the {MAX_EXPANSION} seed limit");
    }
    let mut rng = ChaCha20Rng::seed_from_u64(base);
    Ok((0..count).map(|_| rng.r#gen::<u64>()).collect())
}

fn range_seeds(token: &str) -> Result<Vec<u64>> {
    let (start, end, inclusive) = if let Some((start, end)) = token.split_once("..=") {
        (start, end, true)
    } else if let Some((start, end)) = token.split_once("..") {
        (start, end, false)
    } else {
        bail!("invalid seed range `{token}`");
    };
    let start: u64 = start.parse().with_context(|| format!("invalid range start in `{token}`"))?;
    let end: u64 = end.parse().with_context(|| format!("invalid range end in `{token}`"))?;
    let end = if inclusive { end.saturating_add(1) } else { end };
    if end <= start {
        bail!("empty seed range `{token}`");
    }
    if end - start > MAX_EXPANSION {
        bail!("seed range `{token}` exceeds the {MAX_EXPANSION} seed limit");
    }
    Ok((start..end).collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tokens(items: &[&str]) -> Vec<String> {
        items.iter().map(ToString::to_string).collect()
    }

    #[test]
    fn literals_and_ranges() {
        let seeds = resolve_seed_inputs(&tokens(&["7", "-3", "10..13", "20..=21"])).unwrap();
        assert_eq!(seeds, vec![7, 3, 10, 11, 12, 20, 21]);
    }

    #[test]
    fn random_expansion_is_reproducible() {
        let first = resolve_seed_inputs(&tokens(&["random:4@99"])).unwrap();
        let second = resolve_seed_inputs(&tokens(&["random:4@99"])).unwrap();
        assert_eq!(first.len(), 4);
        assert_eq!(first, second);
        assert_ne!(first, resolve_seed_inputs(&tokens(&["random:4@100"])).unwrap());
    }

    #[test]
    fn rejects_bad_tokens() {
        assert!(resolve_seed_inputs(&tokens(&["banana"])).is_err());
        assert!(resolve_seed_inputs(&tokens(&["5..5"])).is_err());
        assert!(resolve_seed_inputs(&tokens(&["random:x"])).is_err());
        assert!(resolve_seed_inputs(&tokens(&[""])).is_err());
    }
}
