use fnv::FnvHashSet;

type Trigram = [char; 3];

/// Returns the trigram similarity between two strings, in `[0, 1]`.
///
/// Each string is split into words of alphanumeric characters. Each word is
/// lowercased and padded with two spaces in front and one behind, and every
/// window of three characters is a trigram. The similarity is the number of
/// trigrams the two strings share divided by the number of distinct trigrams
/// in either of them. Word order and punctuation therefore don't matter, so
/// `Reeves, Keanu` is identical to `keanu reeves`.
///
/// If either string has no words, then the similarity is `0`.
pub fn similarity(a: &str, b: &str) -> f64 {
    let (ta, tb) = (trigrams(a), trigrams(b));
    if ta.is_empty() || tb.is_empty() {
        return 0.0;
    }
    let shared = ta.intersection(&tb).count();
    let total = ta.len() + tb.len() - shared;
    shared as f64 / total as f64
}

fn trigrams(s: &str) -> FnvHashSet<Trigram> {
    let mut set = FnvHashSet::default();
    let mut padded: Vec<char> = vec![];
    for word in s.split(|c: char| !c.is_alphanumeric()) {
        if word.is_empty() {
            continue;
        }
        padded.clear();
        padded.extend(&[' ', ' ']);
        padded.extend(word.chars().flat_map(char::to_lowercase));
        padded.push(' ');
        for w in padded.windows(3) {
            set.insert([w[0], w[1], w[2]]);
        }
    }
    set
}

#[cfg(test)]
mod tests {
    use super::*;

    fn close(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn identical() {
        assert!(close(similarity("The Simpsons", "the simpsons"), 1.0));
        assert!(close(similarity("Reeves, Keanu", "keanu reeves"), 1.0));
    }

    #[test]
    fn disjoint() {
        assert!(close(similarity("The Simpsons", "Futurama"), 0.0));
    }

    #[test]
    fn empty() {
        assert!(close(similarity("", "matrix"), 0.0));
        assert!(close(similarity("...", "matrix"), 0.0));
        assert!(close(similarity("", ""), 0.0));
    }

    #[test]
    fn partial() {
        // "matrix" has 7 trigrams, all of which are among the 11 of
        // "the matrix".
        assert!(close(similarity("matrix", "The Matrix"), 7.0 / 11.0));
        assert!(close(similarity("matrix", "The Matrix Reloaded"), 7.0 / 20.0));
        assert!(
            similarity("matrix", "The Matrix")
                > similarity("matrix", "The Matrix Reloaded")
        );
    }

    #[test]
    fn trigram_count() {
        assert_eq!(trigrams("a").len(), 2);
        assert_eq!(trigrams("cat").len(), 4);
        assert_eq!(trigrams("cat cat").len(), 4);
        assert_eq!(trigrams("Ünïcödé").len(), 8);
    }
}
