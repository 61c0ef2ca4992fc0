use std::fmt;

/// One end of a NuGet version interval.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VersionBound {
    pub version: String,
    pub inclusive: bool,
}

/// NuGet version range in interval notation.
///
/// A bare version (`1.0`) means "1.0 or higher". Brackets are inclusive,
/// parentheses exclusive: `[1.0,2.0)`, `(,1.0]`, `[1.0]`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VersionRange {
    pub min: Option<VersionBound>,
    pub max: Option<VersionBound>,
}

impl VersionRange {
    /// Parse a range; returns `None` when the text is not valid interval notation.
    pub fn parse(input: &str) -> Option<Self> {
        let input = input.trim();
        if input.is_empty() {
            return None;
        }

        let first = input.chars().next()?;
        if first != '[' && first != '(' {
            if input.contains([',', '[', ']', '(', ')']) {
                return None;
            }
            return Some(Self {
                min: Some(VersionBound { version: input.to_string(), inclusive: true }),
                max: None,
            });
        }

        let last = input.chars().last()?;
        if input.len() < 2 || (last != ']' && last != ')') {
            return None;
        }
        let min_inclusive = first == '[';
        let max_inclusive = last == ']';
        let inner = &input[1..input.len() - 1];

        let Some((low, high)) = inner.split_once(',') else {
            // [1.0] pins an exact version; (1.0) is meaningless
            let version = inner.trim();
            if !min_inclusive || !max_inclusive || version.is_empty() {
                return None;
            }
            let bound = VersionBound { version: version.to_string(), inclusive: true };
            return Some(Self { min: Some(bound.clone()), max: Some(bound) });
        };

        if high.contains(',') {
            return None;
        }

        let bound = |text: &str, inclusive: bool| {
            let text = text.trim();
            (!text.is_empty()).then(|| VersionBound { version: text.to_string(), inclusive })
        };

        Some(Self {
            min: bound(low, min_inclusive),
            max: bound(high, max_inclusive),
        })
    }

    pub fn is_exact(&self) -> bool {
        matches!((&self.min, &self.max), (Some(min), Some(max)) if min == max && min.inclusive)
    }

    /// The lowest version that satisfies the range, when the range names one.
    pub fn lowest_applicable(&self) -> Option<&str> {
        self.min
            .as_ref()
            .filter(|bound| bound.inclusive)
            .map(|bound| bound.version.as_str())
    }
}

impl fmt::Display for VersionRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_exact() {
            if let Some(min) = &self.min {
                return write!(f, "= {}", min.version);
            }
        }

        match (&self.min, &self.max) {
            (None, None) => write!(f, "any"),
            (Some(min), None) => write!(f, "{} {}", lower_op(min), min.version),
            (None, Some(max)) => write!(f, "{} {}", upper_op(max), max.version),
            (Some(min), Some(max)) => write!(
                f,
                "{} {}, {} {}",
                lower_op(min),
                min.version,
                upper_op(max),
                max.version
            ),
        }
    }
}

fn lower_op(bound: &VersionBound) -> &'static str {
    if bound.inclusive { ">=" } else { ">" }
}

fn upper_op(bound: &VersionBound) -> &'static str {
    if bound.inclusive { "<=" } else { "<" }
}
