use std::collections::HashMap;

/// Shared prefix length from which two descriptions always match
const PREFIX_MATCH_LEN: usize = 15;
/// Minimum blended score for a match
const MATCH_THRESHOLD: f64 = 0.5;
/// Sequences at least this long get their most frequent characters ignored when looking for
/// matching blocks
const AUTOJUNK_MIN_LEN: usize = 200;

/// Whether two lower-cased descriptions refer to the same payee.
///
/// Long common prefixes win outright: source systems usually truncate or pad merchant names
/// consistently, with reference numbers at the end. Shorter prefixes are blended with the
/// matching-block ratio of the whole strings.
pub fn is_similar(candidate: &str, incoming: &str) -> bool {
    let a: Vec<char> = candidate.chars().collect();
    let b: Vec<char> = incoming.chars().collect();

    let prefix = common_prefix_len(&a, &b);
    if prefix >= PREFIX_MATCH_LEN {
        return true;
    }
    let prefix = prefix as f64;
    let score = (prefix - 8.0).powi(3) / 2000.0 + 0.03 * prefix + 0.75 * ratio(&a, &b);
    score > MATCH_THRESHOLD
}

fn common_prefix_len(a: &[char], b: &[char]) -> usize {
    a.iter().zip(b).take_while(|(x, y)| x == y).count()
}

/// Similarity ratio `2 * M / T` in `[0, 1]`, where `M` is the total size of the matching blocks
/// and `T` the combined length of both sequences.
///
/// Matching blocks are found by taking the longest common contiguous block, then recursing on
/// the unmatched pieces to its left and to its right.
pub fn ratio(a: &[char], b: &[char]) -> f64 {
    let total = a.len() + b.len();
    if total == 0 {
        return 1.0;
    }
    let matched = BlockMatcher::new(a, b).matched_len();
    2.0 * matched as f64 / total as f64
}

struct BlockMatcher<'a> {
    a: &'a [char],
    b: &'a [char],
    /// Positions of each character of `b`, in increasing order
    b_positions: HashMap<char, Vec<usize>>,
}

impl<'a> BlockMatcher<'a> {
    fn new(a: &'a [char], b: &'a [char]) -> Self {
        let mut b_positions: HashMap<char, Vec<usize>> = HashMap::new();
        for (j, c) in b.iter().enumerate() {
            b_positions.entry(*c).or_default().push(j);
        }
        if b.len() >= AUTOJUNK_MIN_LEN {
            let popular_above = b.len() / 100 + 1;
            b_positions.retain(|_, positions| positions.len() <= popular_above);
        }
        Self { a, b, b_positions }
    }

    fn matched_len(&self) -> usize {
        let mut matched = 0;
        let mut queue = vec![(0, self.a.len(), 0, self.b.len())];
        while let Some((a_lo, a_hi, b_lo, b_hi)) = queue.pop() {
            let (i, j, size) = self.longest_match(a_lo, a_hi, b_lo, b_hi);
            if size == 0 {
                continue;
            }
            matched += size;
            if a_lo < i && b_lo < j {
                queue.push((a_lo, i, b_lo, j));
            }
            if i + size < a_hi && j + size < b_hi {
                queue.push((i + size, a_hi, j + size, b_hi));
            }
        }
        matched
    }

    /// Longest block `a[i..i+size] == b[j..j+size]` within the given bounds, leftmost in `a`
    /// then in `b` on ties.
    fn longest_match(
        &self,
        a_lo: usize,
        a_hi: usize,
        b_lo: usize,
        b_hi: usize,
    ) -> (usize, usize, usize) {
        let (mut best_i, mut best_j, mut best_size) = (a_lo, b_lo, 0);
        // Length of the match ending at b[j] for the previous row of `a`
        let mut run_lengths: HashMap<usize, usize> = HashMap::new();
        for i in a_lo..a_hi {
            let mut next_run_lengths = HashMap::new();
            let positions = self.b_positions.get(&self.a[i]).map_or(&[][..], Vec::as_slice);
            for &j in positions {
                if j < b_lo {
                    continue;
                }
                if j >= b_hi {
                    break;
                }
                let k = j
                    .checked_sub(1)
                    .and_then(|prev| run_lengths.get(&prev))
                    .copied()
                    .unwrap_or(0)
                    + 1;
                next_run_lengths.insert(j, k);
                if k > best_size {
                    best_i = i + 1 - k;
                    best_j = j + 1 - k;
                    best_size = k;
                }
            }
            run_lengths = next_run_lengths;
        }

        // Characters dropped as too frequent can still extend a block on either side
        while best_i > a_lo && best_j > b_lo && self.a[best_i - 1] == self.b[best_j - 1] {
            best_i -= 1;
            best_j -= 1;
            best_size += 1;
        }
        while best_i + best_size < a_hi
            && best_j + best_size < b_hi
            && self.a[best_i + best_size] == self.b[best_j + best_size]
        {
            best_size += 1;
        }
        (best_i, best_j, best_size)
    }
}
