use serde::{Deserialize, Serialize};

use crate::error::{Result, SearchError};

/// A checksum-validated ISBN, normalized to its 13-digit form.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Isbn {
    pub raw: String,
    pub isbn13: String,
    pub isbn10: Option<String>,
}

fn strip_isbn(input: &str) -> String {
    input
        .chars()
        .filter(|c| c.is_ascii_alphanumeric())
        .collect::<String>()
        .to_uppercase()
}

fn check_isbn10(digits: &[u8]) -> bool {
    // digits[9] may be 10 (X)
    let sum: u32 = digits
        .iter()
        .enumerate()
        .map(|(i, &d)| (10 - i as u32) * d as u32)
        .sum();
    sum % 11 == 0
}

fn isbn13_sum(digits: &[u8]) -> u32 {
    digits
        .iter()
        .enumerate()
        .map(|(i, &d)| if i % 2 == 0 { d as u32 } else { d as u32 * 3 })
        .sum()
}

fn isbn10_to_isbn13(digits10: &[u8]) -> String {
    let mut d13: Vec<u8> = vec![9, 7, 8];
    d13.extend_from_slice(&digits10[..9]);
    let check = (10 - (isbn13_sum(&d13) % 10)) % 10;
    d13.push(check as u8);
    d13.iter().map(|d| d.to_string()).collect()
}

fn isbn13_to_isbn10(digits13: &[u8]) -> String {
    let d9 = &digits13[3..12];
    let sum: u32 = d9
        .iter()
        .enumerate()
        .map(|(i, &d)| (10 - i as u32) * d as u32)
        .sum();
    let check = (11 - sum % 11) % 11;
    let mut s: String = d9.iter().map(|d| d.to_string()).collect();
    s.push(if check == 10 {
        'X'
    } else {
        char::from(b'0' + check as u8)
    });
    s
}

impl Isbn {
    pub fn parse(input: &str) -> Result<Self> {
        let invalid = || SearchError::InvalidQuery(format!("not a valid ISBN: {input}"));
        let stripped = strip_isbn(input);

        match stripped.len() {
            13 => {
                if !stripped.chars().all(|c| c.is_ascii_digit()) {
                    return Err(invalid());
                }
                let digits: Vec<u8> = stripped.bytes().map(|b| b - b'0').collect();
                if isbn13_sum(&digits) % 10 != 0 {
                    return Err(invalid());
                }
                let isbn10 = stripped
                    .starts_with("978")
                    .then(|| isbn13_to_isbn10(&digits));
                Ok(Self {
                    raw: input.to_string(),
                    isbn13: stripped,
                    isbn10,
                })
            }
            10 => {
                let mut digits: Vec<u8> = Vec::with_capacity(10);
                for (i, c) in stripped.chars().enumerate() {
                    match c {
                        'X' if i == 9 => digits.push(10),
                        '0'..='9' => digits.push(c as u8 - b'0'),
                        _ => return Err(invalid()),
                    }
                }
                if !check_isbn10(&digits) {
                    return Err(invalid());
                }
                Ok(Self {
                    raw: input.to_string(),
                    isbn13: isbn10_to_isbn13(&digits),
                    isbn10: Some(stripped),
                })
            }
            _ => Err(invalid()),
        }
    }
}
