//! Code fence detection.
//!
//! Fences use backticks or tildes, three or more. A closing fence uses the
//! same character, is at least as long as the opening one, and carries
//! nothing but whitespace after the marker.

/// An opening fence: marker character, marker length, info string.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Fence<'a> {
    pub marker: char,
    pub len: usize,
    pub info: &'a str,
}

impl<'a> Fence<'a> {
    /// Detect an opening fence at the start of `line` (leading whitespace
    /// allowed).
    pub(crate) fn open(line: &'a str) -> Option<Self> {
        let trimmed = line.trim_start();
        let marker = trimmed.chars().next().filter(|c| *c == '`' || *c == '~')?;
        let len = trimmed.chars().take_while(|&c| c == marker).count();
        if len < 3 {
            return None;
        }
        let info = trimmed[len..].trim();
        // backtick info strings may not contain backticks
        if marker == '`' && info.contains('`') {
            return None;
        }
        Some(Self { marker, len, info })
    }

    /// First word of the info string.
    pub(crate) fn language(&self) -> Option<&'a str> {
        self.info.split_whitespace().next()
    }

    /// Whether `line` closes this fence.
    pub(crate) fn is_closed_by(&self, line: &str) -> bool {
        let trimmed = line.trim_start();
        let count = trimmed.chars().take_while(|&c| c == self.marker).count();
        count >= self.len && trimmed[count..].trim().is_empty()
    }
}

/// Tracks whether line-by-line processing is inside a fenced block.
#[derive(Debug, Default)]
pub(crate) struct FenceTracker {
    open: Option<(char, usize)>,
}

impl FenceTracker {
    pub(crate) fn in_fence(&self) -> bool {
        self.open.is_some()
    }

    /// Feed the next line. Returns `true` if it opened or closed a fence.
    pub(crate) fn update(&mut self, line: &str) -> bool {
        match self.open {
            Some((marker, len)) => {
                let fence = Fence {
                    marker,
                    len,
                    info: "",
                };
                if fence.is_closed_by(line) {
                    self.open = None;
                    return true;
                }
                false
            }
            None => match Fence::open(line) {
                Some(fence) => {
                    self.open = Some((fence.marker, fence.len));
                    true
                }
                None => false,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_open_backtick_fence_with_language() {
        let fence = Fence::open("```rust title=x").unwrap();
        assert_eq!(fence.marker, '`');
        assert_eq!(fence.len, 3);
        assert_eq!(fence.language(), Some("rust"));
    }

    #[test]
    fn test_short_marker_is_not_a_fence() {
        assert!(Fence::open("``x``").is_none());
        assert!(Fence::open("text").is_none());
    }

    #[test]
    fn test_close_requires_same_char_and_length() {
        let fence = Fence::open("````").unwrap();
        assert!(!fence.is_closed_by("```"));
        assert!(!fence.is_closed_by("~~~~"));
        assert!(!fence.is_closed_by("```` trailing"));
        assert!(fence.is_closed_by("`````  "));
    }

    #[test]
    fn test_tracker_follows_nesting_of_other_marker() {
        let mut tracker = FenceTracker::default();
        assert!(tracker.update("~~~"));
        assert!(tracker.in_fence());
        assert!(!tracker.update("```"));
        assert!(tracker.in_fence());
        assert!(tracker.update("~~~"));
        assert!(!tracker.in_fence());
    }
}
