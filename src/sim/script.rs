//! Animation frame script parser
//!
//! A script is a `-` separated list of frames. Each frame is a run of
//! lowercase tags (each optionally followed by a signed integer) and ends
//! with an uppercase sprite letter plus a duration in ticks:
//!
//! ```text
//! s3mx40m30A4-kB6-C10
//! ```
//!
//! Tags are matched longest first (up to three characters). Unknown tags are
//! skipped together with their argument so newer data keeps loading.

/// Known tags and whether they take an integer argument
const KNOWN_TAGS: &[(&str, bool)] = &[
    // palette tricks
    ("bpd", true),
    ("bpn", true),
    ("bps", true),
    ("bpb", true),
    ("bpo", false),
    ("bz", true),
    ("bt", false),
    // sound
    ("s", true),
    ("l", true),
    ("sb", true),
    ("sf", true),
    // spawn / destroy
    ("m", true),
    ("mx", true),
    ("my", true),
    ("mg", true),
    ("mp", true),
    ("ms", false),
    ("md", true),
    ("vx", true),
    ("vy", true),
    // positioning
    ("x=", true),
    ("y=", true),
    // playback
    ("d", true),
    ("r", false),
    ("k", true),
    // move chaining
    ("jn", true),
    ("jl", false),
    ("jm", false),
    ("jh", false),
    ("jf", false),
    ("jf2", false),
    // invulnerability
    ("zz", false),
    ("zl", false),
    ("zm", false),
    ("zh", false),
    ("zj", false),
    ("zp", false),
    // misc flags
    ("e", false),
    ("ug", false),
    ("i", false),
    ("n", false),
];

fn lookup(candidate: &[u8]) -> Option<(&'static str, bool)> {
    KNOWN_TAGS
        .iter()
        .find(|(key, _)| key.as_bytes() == candidate)
        .copied()
}

/// A parsed tag
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Tag {
    pub key: &'static str,
    pub value: i32,
}

/// One frame of a script
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Frame {
    /// Sprite letter index (A = 0)
    pub sprite: u8,
    pub duration: u32,
    /// First tick this frame covers
    pub start_tick: u32,
    pub tags: Vec<Tag>,
}

impl Frame {
    /// Argument of a tag, if present
    pub fn get(&self, key: &str) -> Option<i32> {
        self.tags.iter().find(|t| t.key == key).map(|t| t.value)
    }

    pub fn is_set(&self, key: &str) -> bool {
        self.tags.iter().any(|t| t.key == key)
    }
}

/// Parsed frame list
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Script {
    frames: Vec<Frame>,
    total_ticks: u32,
}

impl Script {
    pub fn parse(src: &str) -> Self {
        let bytes = src.as_bytes();
        let mut frames = Vec::new();
        let mut tags = Vec::new();
        let mut start_tick = 0u32;
        let mut i = 0;

        while i < bytes.len() {
            let c = bytes[i];
            match c {
                b'a'..=b'z' => {
                    let matched = (1..=3).rev().find_map(|n| {
                        bytes
                            .get(i..i + n)
                            .and_then(lookup)
                            .map(|tag| (tag, n))
                    });
                    match matched {
                        Some(((key, has_arg), n)) => {
                            i += n;
                            let value = if has_arg {
                                read_int(bytes, &mut i).unwrap_or(0)
                            } else {
                                0
                            };
                            tags.push(Tag { key, value });
                        }
                        None => {
                            let start = i;
                            while i < bytes.len()
                                && (bytes[i].is_ascii_lowercase() || bytes[i] == b'=')
                            {
                                i += 1;
                            }
                            let _ = read_int(bytes, &mut i);
                            log::debug!(
                                "Skipping unknown animation tag {:?}",
                                String::from_utf8_lossy(&bytes[start..i])
                            );
                        }
                    }
                }
                b'A'..=b'Z' => {
                    i += 1;
                    let duration = read_int(bytes, &mut i).unwrap_or(0).max(0) as u32;
                    frames.push(Frame {
                        sprite: c - b'A',
                        duration,
                        start_tick,
                        tags: std::mem::take(&mut tags),
                    });
                    start_tick += duration;
                }
                _ => i += 1,
            }
        }

        Self {
            frames,
            total_ticks: start_tick,
        }
    }

    pub fn frames(&self) -> &[Frame] {
        &self.frames
    }

    pub fn frame(&self, index: usize) -> Option<&Frame> {
        self.frames.get(index)
    }

    pub fn is_empty(&self) -> bool {
        self.total_ticks == 0
    }

    /// Sum of all frame durations
    pub fn total_ticks(&self) -> u32 {
        self.total_ticks
    }

    /// Index of the frame active at a tick
    pub fn frame_at(&self, tick: u32) -> Option<usize> {
        self.frames
            .iter()
            .position(|f| tick >= f.start_tick && tick < f.start_tick + f.duration)
    }
}

/// Read an optionally signed decimal integer, advancing the cursor
fn read_int(bytes: &[u8], i: &mut usize) -> Option<i32> {
    let start = *i;
    let mut j = *i;
    if matches!(bytes.get(j), Some(b'-') | Some(b'+'))
        && bytes.get(j + 1).is_some_and(u8::is_ascii_digit)
    {
        j += 1;
    }
    let digits_start = j;
    while bytes.get(j).is_some_and(u8::is_ascii_digit) {
        j += 1;
    }
    if j == digits_start {
        return None;
    }
    *i = j;
    std::str::from_utf8(&bytes[start..j])
        .ok()
        .and_then(|s| s.parse::<i32>().ok())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_single_frame() {
        let s = Script::parse("A5");
        assert_eq!(s.frames().len(), 1);
        assert_eq!(s.total_ticks(), 5);
        assert_eq!(s.frames()[0].sprite, 0);
        assert!(s.frames()[0].tags.is_empty());
    }

    #[test]
    fn test_parse_tags_and_timing() {
        let s = Script::parse("bpd10bpn5A3-s3l80B4-kC2");
        assert_eq!(s.total_ticks(), 9);
        let f = s.frame(0).unwrap();
        assert_eq!(f.get("bpd"), Some(10));
        assert_eq!(f.get("bpn"), Some(5));
        let f = s.frame(1).unwrap();
        assert_eq!(f.sprite, 1);
        assert_eq!(f.start_tick, 3);
        assert_eq!(f.get("s"), Some(3));
        assert_eq!(f.get("l"), Some(80));
        assert!(s.frame(2).unwrap().is_set("k"));
    }

    #[test]
    fn test_longest_tag_wins() {
        let s = Script::parse("ms mx-40my20m30A1");
        let f = s.frame(0).unwrap();
        assert!(f.is_set("ms"));
        assert_eq!(f.get("mx"), Some(-40));
        assert_eq!(f.get("my"), Some(20));
        assert_eq!(f.get("m"), Some(30));
    }

    #[test]
    fn test_chain_tags() {
        let s = Script::parse("A4-jn22jmB2-jf2C4-jfjlD1");
        let b = s.frame(1).unwrap();
        assert_eq!(b.get("jn"), Some(22));
        assert!(b.is_set("jm"));
        let c = s.frame(2).unwrap();
        assert!(c.is_set("jf2"));
        assert!(!c.is_set("jf"));
        assert_eq!(c.sprite, 2);
        assert_eq!(c.duration, 4);
        let d = s.frame(3).unwrap();
        assert!(d.is_set("jf") && d.is_set("jl"));
        assert!(!d.is_set("jf2"));
    }

    #[test]
    fn test_positional_tags() {
        let s = Script::parse("x=-12y=4A1");
        let f = s.frame(0).unwrap();
        assert_eq!(f.get("x="), Some(-12));
        assert_eq!(f.get("y="), Some(4));
    }

    #[test]
    fn test_unknown_tags_are_inert() {
        let s = Script::parse("qqq12A4-wB2");
        assert_eq!(s.frames().len(), 2);
        assert_eq!(s.total_ticks(), 6);
        assert!(s.frame(0).unwrap().tags.is_empty());
        assert!(s.frame(1).unwrap().tags.is_empty());
    }

    #[test]
    fn test_frame_at() {
        let s = Script::parse("A2-B3-C1");
        assert_eq!(s.frame_at(0), Some(0));
        assert_eq!(s.frame_at(1), Some(0));
        assert_eq!(s.frame_at(2), Some(1));
        assert_eq!(s.frame_at(4), Some(1));
        assert_eq!(s.frame_at(5), Some(2));
        assert_eq!(s.frame_at(6), None);
    }

    #[test]
    fn test_empty_script() {
        let s = Script::parse("");
        assert!(s.is_empty());
        assert_eq!(s.frame_at(0), None);
    }

    proptest::proptest! {
        #[test]
        fn prop_frame_timing_is_contiguous(src in "([a-z=]{0,4}[A-Z][0-9]{0,3}-?){0,8}") {
            let s = Script::parse(&src);
            let mut next = 0;
            for f in s.frames() {
                proptest::prop_assert_eq!(f.start_tick, next);
                next += f.duration;
            }
            proptest::prop_assert_eq!(s.total_ticks(), next);
        }
    }
}
