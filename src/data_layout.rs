use indexmap::IndexMap;

use crate::frame::Frame;

// INTEGER and CHAR, also every temporary
pub const WORD_SIZE: i64 = 2;

pub const REAL_SIZE: i64 = 4;

// |saved BP|return address| between BP and the last pushed argument
pub const FRAME_LINKAGE: i64 = 4;

/// What the code generator needs to know about declarations that the TAC
/// text does not carry. Captured by the parser before the scopes are evicted.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct DataLayout {
    // global variables and module level temporaries in declaration order
    pub globals: Vec<String>,
    // (label, content) in registration order
    pub strings: Vec<(String, String)>,
    pub frames: IndexMap<String, Frame>,
}

impl DataLayout {
    pub fn frame(&self, name: &str) -> Option<&Frame> {
        self.frames.get(name)
    }
}
