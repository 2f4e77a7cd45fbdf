use std::fmt::Display;

// for intermediate results of an expression
#[derive(Debug, PartialEq, Eq, Clone, Copy, Hash)]
pub struct Temp(pub usize);

impl Temp {
    pub const PREFIX: &'static str = "_t";

    pub fn is_temp_name(name: &str) -> bool {
        name.strip_prefix(Self::PREFIX)
            .is_some_and(|n| !n.is_empty() && n.chars().all(|c| c.is_ascii_digit()))
    }
}

impl Display for Temp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}{}", Self::PREFIX, self.0)
    }
}

// for string literal location in the data segment
#[derive(Debug, PartialEq, Eq, Clone, Copy, Hash)]
pub struct Label(pub usize);

impl Display for Label {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "_S{}", self.0)
    }
}
