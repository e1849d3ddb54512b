//! Random password generation.
//!
//! Passwords are drawn from up to four character classes.  Characters
//! that are easy to misread (`i l o I L O 0 1`) are left out of the
//! sets.  Every requested class is guaranteed to appear at least once:
//! one character is picked from each class first, the rest is filled
//! from the union of the classes, and the result is shuffled.
//!
//! Only cryptographically secure generators are accepted, enforced by
//! the `CryptoRng` bound on [`generate_with`].

use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use rand::seq::SliceRandom;
use rand::{CryptoRng, Rng};
use zeroize::Zeroizing;

use crate::errors::{PassVaultError, Result};

/// Default password length.
pub const DEFAULT_LENGTH: usize = 20;

const LOWER: &[u8] = b"abcdefghjkmnpqrstuvwxyz";
const UPPER: &[u8] = b"ABCDEFGHJKMNPQRSTUVWXYZ";
const DIGIT: &[u8] = b"23456789";
const SYMBOL: &[u8] = b"&#{}()[]-_^@+=%?";

/// A class of characters a password may draw from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum CharClass {
    Lower,
    Upper,
    Digit,
    Symbol,
}

impl CharClass {
    pub const ALL: [CharClass; 4] = [
        CharClass::Lower,
        CharClass::Upper,
        CharClass::Digit,
        CharClass::Symbol,
    ];

    /// The characters this class draws from.
    pub fn charset(self) -> &'static [u8] {
        match self {
            CharClass::Lower => LOWER,
            CharClass::Upper => UPPER,
            CharClass::Digit => DIGIT,
            CharClass::Symbol => SYMBOL,
        }
    }

    /// Whether `c` belongs to this class's character set.
    pub fn contains(self, c: char) -> bool {
        c.is_ascii() && self.charset().contains(&(c as u8))
    }
}

impl fmt::Display for CharClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            CharClass::Lower => "lower",
            CharClass::Upper => "upper",
            CharClass::Digit => "digit",
            CharClass::Symbol => "symbol",
        };
        f.write_str(name)
    }
}

impl FromStr for CharClass {
    type Err = PassVaultError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "lower" | "lowercase" => Ok(CharClass::Lower),
            "upper" | "uppercase" => Ok(CharClass::Upper),
            "digit" | "digits" => Ok(CharClass::Digit),
            "symbol" | "symbols" | "special" => Ok(CharClass::Symbol),
            other => Err(PassVaultError::InvalidPolicy(format!(
                "unknown character class '{other}' (expected lower, upper, digit or symbol)"
            ))),
        }
    }
}

/// What a generated password must look like.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PasswordPolicy {
    /// Exact number of characters.
    pub length: usize,
    /// Classes to draw from; each appears at least once.
    pub classes: BTreeSet<CharClass>,
}

impl Default for PasswordPolicy {
    fn default() -> Self {
        Self {
            length: DEFAULT_LENGTH,
            classes: CharClass::ALL.into_iter().collect(),
        }
    }
}

impl PasswordPolicy {
    pub fn new(length: usize, classes: impl IntoIterator<Item = CharClass>) -> Self {
        Self {
            length,
            classes: classes.into_iter().collect(),
        }
    }

    /// Parse a comma-separated class list such as `"lower,digit"`.
    pub fn parse_classes(list: &str) -> Result<BTreeSet<CharClass>> {
        list.split(',')
            .filter(|part| !part.trim().is_empty())
            .map(|part| part.parse::<CharClass>())
            .collect()
    }

    /// Check that the policy can be satisfied.
    pub fn validate(&self) -> Result<()> {
        if self.length == 0 {
            return Err(PassVaultError::InvalidPolicy(
                "password length must be at least 1".into(),
            ));
        }
        if self.classes.is_empty() {
            return Err(PassVaultError::InvalidPolicy(
                "at least one character class is required".into(),
            ));
        }
        if self.length < self.classes.len() {
            return Err(PassVaultError::InvalidPolicy(format!(
                "length {} is too short to include all {} requested classes",
                self.length,
                self.classes.len()
            )));
        }
        Ok(())
    }
}

/// Generate a password with the thread-local CSPRNG.
pub fn generate(policy: &PasswordPolicy) -> Result<Zeroizing<String>> {
    generate_with(policy, &mut rand::rng())
}

/// Generate a password with a caller-supplied cryptographic RNG.
pub fn generate_with<R>(policy: &PasswordPolicy, rng: &mut R) -> Result<Zeroizing<String>>
where
    R: Rng + CryptoRng + ?Sized,
{
    policy.validate()?;

    let mut chars = Zeroizing::new(Vec::with_capacity(policy.length));
    for class in &policy.classes {
        chars.push(pick(class.charset(), rng));
    }

    let pool: Vec<u8> = policy
        .classes
        .iter()
        .flat_map(|class| class.charset().iter().copied())
        .collect();
    while chars.len() < policy.length {
        chars.push(pick(&pool, rng));
    }

    chars.shuffle(rng);
    Ok(Zeroizing::new(chars.iter().map(|&b| char::from(b)).collect()))
}

fn pick<R: Rng + ?Sized>(set: &[u8], rng: &mut R) -> u8 {
    set[rng.random_range(0..set.len())]
}
