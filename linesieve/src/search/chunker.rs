use tracing::debug;

/// A contiguous run of lines assigned to one worker
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Chunk<'a> {
    /// 0-based index of the first line in the original text
    pub start_line_index: usize,
    pub lines: Vec<&'a str>,
}

impl<'a> Chunk<'a> {
    pub fn len(&self) -> usize {
        self.lines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    /// Original line indices paired with their text
    pub fn indexed_lines(&self) -> impl Iterator<Item = (usize, &'a str)> + '_ {
        self.lines
            .iter()
            .enumerate()
            .map(move |(offset, line)| (self.start_line_index + offset, *line))
    }
}

/// Splits `text` on line boundaries into at most `desired_chunks` chunks.
///
/// Every chunk but the last holds `line_count / chunk_count` lines; the last
/// absorbs the remainder. With fewer lines than `desired_chunks` each line
/// gets its own chunk. No chunk is ever empty, so empty text yields none.
pub fn split(text: &str, desired_chunks: usize) -> Vec<Chunk<'_>> {
    let lines: Vec<&str> = text.lines().collect();
    let total = lines.len();
    if total == 0 {
        return Vec::new();
    }

    let chunk_count = desired_chunks.clamp(1, total);
    let per_chunk = total / chunk_count;

    let mut chunks = Vec::with_capacity(chunk_count);
    let mut rest = lines.as_slice();
    let mut start_line_index = 0;
    for i in 0..chunk_count {
        let take = if i + 1 == chunk_count {
            rest.len()
        } else {
            per_chunk
        };
        let (head, tail) = rest.split_at(take);
        chunks.push(Chunk {
            start_line_index,
            lines: head.to_vec(),
        });
        start_line_index += take;
        rest = tail;
    }

    debug!(
        "Split {} lines into {} chunks of ~{} lines",
        total, chunk_count, per_chunk
    );
    chunks
}

#[cfg(test)]
mod tests {
    use super::*;

    fn numbered(count: usize) -> String {
        (0..count)
            .map(|i| format!("line {}", i))
            .collect::<Vec<_>>()
            .join("\n")
    }

    fn rejoin(chunks: &[Chunk<'_>]) -> Vec<String> {
        chunks
            .iter()
            .flat_map(|c| c.lines.iter().map(|l| l.to_string()))
            .collect()
    }

    #[test]
    fn test_even_split() {
        let text = numbered(8);
        let chunks = split(&text, 4);
        assert_eq!(chunks.len(), 4);
        assert!(chunks.iter().all(|c| c.len() == 2));
        assert_eq!(
            chunks.iter().map(|c| c.start_line_index).collect::<Vec<_>>(),
            vec![0, 2, 4, 6]
        );
    }

    #[test]
    fn test_last_chunk_absorbs_remainder() {
        let text = numbered(10);
        let chunks = split(&text, 4);
        let sizes: Vec<_> = chunks.iter().map(Chunk::len).collect();
        assert_eq!(sizes, vec![2, 2, 2, 4]);
        assert_eq!(chunks[3].start_line_index, 6);
    }

    #[test]
    fn test_fewer_lines_than_chunks() {
        let text = numbered(3);
        let chunks = split(&text, 8);
        assert_eq!(chunks.len(), 3);
        assert!(chunks.iter().all(|c| c.len() == 1));
    }

    #[test]
    fn test_empty_text() {
        assert!(split("", 4).is_empty());
    }

    #[test]
    fn test_zero_desired_is_one_chunk() {
        let text = numbered(5);
        let chunks = split(&text, 0);
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].len(), 5);
    }

    #[test]
    fn test_reconstructs_original_lines() {
        let text = "first\r\nsecond\n\nfourth\nfifth";
        let expected: Vec<String> = text.lines().map(str::to_string).collect();
        for workers in 1..=7 {
            let chunks = split(text, workers);
            assert!(chunks.iter().all(|c| !c.is_empty()));
            assert_eq!(rejoin(&chunks), expected, "workers = {}", workers);
        }
    }

    #[test]
    fn test_deterministic_boundaries() {
        let text = numbered(1001);
        assert_eq!(split(&text, 6), split(&text, 6));
    }

    #[test]
    fn test_indexed_lines() {
        let text = numbered(5);
        let chunks = split(&text, 2);
        let indexed: Vec<_> = chunks[1].indexed_lines().collect();
        assert_eq!(indexed[0], (2, "line 2"));
        assert_eq!(indexed.last().copied(), Some((4, "line 4")));
    }
}
