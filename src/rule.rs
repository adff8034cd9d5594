use crate::{Error, Result};
use std::fmt;
use std::str::FromStr;

const MASK_BITS: u32 = 9;

/// Life-like birth/survival rule.
///
/// Bit `k` of a mask is set when `k` live neighbours cause a birth (for a dead
/// cell) or survival (for a live cell).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Rule {
    birth: u16,
    survival: u16,
}

impl Rule {
    /// Builds a rule from two 9-bit masks.
    ///
    /// Fails if any mask has bits above bit 8, or if the rule gives birth on
    /// zero neighbours.
    pub fn new(birth_mask: u32, survival_mask: u32) -> Result<Self> {
        for (which, mask) in [("birth", birth_mask), ("survival", survival_mask)] {
            if mask >> MASK_BITS != 0 {
                return Err(Error::InvalidRuleMask { which, mask });
            }
        }
        if birth_mask & 1 != 0 {
            return Err(Error::UnsupportedBirthOnZero);
        }
        Ok(Self {
            birth: birth_mask as u16,
            survival: survival_mask as u16,
        })
    }

    /// B3/S23
    pub fn conway() -> Self {
        Self {
            birth: 1 << 3,
            survival: (1 << 2) | (1 << 3),
        }
    }

    pub fn birth_mask(&self) -> u32 {
        self.birth as u32
    }

    pub fn survival_mask(&self) -> u32 {
        self.survival as u32
    }

    /// State of a cell in the next generation.
    #[inline]
    pub fn next_state(&self, alive: bool, neighbours: u32) -> bool {
        let mask = if alive { self.survival } else { self.birth };
        mask >> neighbours & 1 != 0
    }
}

impl Default for Rule {
    fn default() -> Self {
        Self::conway()
    }
}

impl fmt::Display for Rule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let digits = |mask: u16| -> String {
            (0..MASK_BITS)
                .filter(|k| mask >> k & 1 != 0)
                .map(|k| char::from(b'0' + k as u8))
                .collect()
        };
        write!(f, "B{}/S{}", digits(self.birth), digits(self.survival))
    }
}

impl FromStr for Rule {
    type Err = Error;

    /// Parses `B3/S23` notation; the two halves may come in either order.
    fn from_str(s: &str) -> Result<Self> {
        let invalid = || Error::InvalidRuleString(s.to_string());

        let (mut birth, mut survival) = (None, None);
        let mut parts = s.trim().split('/');
        for part in parts.by_ref().take(2) {
            let mut chars = part.chars();
            let slot = match chars.next().map(|c| c.to_ascii_uppercase()) {
                Some('B') => &mut birth,
                Some('S') => &mut survival,
                _ => return Err(invalid()),
            };
            if slot.is_some() {
                return Err(invalid());
            }
            let mut mask = 0u32;
            for c in chars {
                let k = c.to_digit(10).filter(|&k| k < MASK_BITS).ok_or_else(invalid)?;
                if mask >> k & 1 != 0 {
                    return Err(invalid());
                }
                mask |= 1 << k;
            }
            *slot = Some(mask);
        }
        if parts.next().is_some() {
            return Err(invalid());
        }
        match (birth, survival) {
            (Some(birth), Some(survival)) => Rule::new(birth, survival),
            _ => Err(invalid()),
        }
    }
}

/// Precomputed single-generation transition of a 4x4 block.
///
/// The index is a 4x4 block of cells (bit `y * 4 + x`), the value is the next
/// state of its inner 2x2 block (bit `dy * 2 + dx` for cell `(1 + dx, 1 + dy)`).
pub struct RuleTable {
    rule: Rule,
    table: Box<[u8]>,
}

impl RuleTable {
    pub fn new(rule: Rule) -> Self {
        let table = (0..=u16::MAX)
            .map(|block| Self::compute_inner(rule, block))
            .collect::<Vec<_>>()
            .into_boxed_slice();
        Self { rule, table }
    }

    fn compute_inner(rule: Rule, block: u16) -> u8 {
        let cell = |x: i32, y: i32| (block >> (y * 4 + x) & 1) as u32;
        let mut result = 0;
        for dy in 0..2 {
            for dx in 0..2 {
                let (cx, cy) = (1 + dx, 1 + dy);
                let mut neighbours = 0;
                for ny in -1..=1 {
                    for nx in -1..=1 {
                        if nx != 0 || ny != 0 {
                            neighbours += cell(cx + nx, cy + ny);
                        }
                    }
                }
                if rule.next_state(cell(cx, cy) != 0, neighbours) {
                    result |= 1 << (dy * 2 + dx);
                }
            }
        }
        result
    }

    pub fn rule(&self) -> Rule {
        self.rule
    }

    /// Advances the inner 2x2 of a 4x4 block by one generation.
    #[inline]
    pub fn step_4x4(&self, block: u16) -> u8 {
        self.table[block as usize]
    }
}
