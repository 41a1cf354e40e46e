//! Textual grid references for the British and Irish national grids.
//!
//! A reference like "SO8001" names a square, not a point: letters select
//! 100 km (and, on the British grid, 500 km) blocks, and the digits split
//! the block. The digit count sets the square size, from 1 km at four
//! figures down to 1 m at ten.

use crate::error::LocationError;
use crate::model::GridSystem;

/// 5x5 letter blocks, northernmost row first. 'I' is not used.
const GRID_LETTERS: [&str; 5] = ["ABCDE", "FGHJK", "LMNOP", "QRSTU", "VWXYZ"];

/// Digit counts a grid reference may carry.
pub const VALID_DIGITS: [u8; 4] = [4, 6, 8, 10];

/// (column, row-from-south) of a grid letter.
fn letter_cell(letter: char) -> Option<(i64, i64)> {
    GRID_LETTERS.iter().enumerate().find_map(|(i, row)| {
        row.find(letter)
            .map(|j| (j as i64, 4 - i as i64))
    })
}

fn grid_letter(row_from_north: i64, column: i64) -> Option<char> {
    if !(0..5).contains(&row_from_north) || !(0..5).contains(&column) {
        return None;
    }
    GRID_LETTERS[row_from_north as usize]
        .chars()
        .nth(column as usize)
}

/// Convert a grid reference to the eastings and northings of the square's
/// south-west corner.
pub fn gridref_to_en(system: GridSystem, text: &str) -> Result<(i32, i32), LocationError> {
    let malformed = || LocationError::MalformedGridReference(text.to_string());

    let chars: Vec<char> = text.chars().collect();
    let prefix = match system {
        GridSystem::Osgb36 => 2,
        GridSystem::IrishGrid => 1,
    };
    let digits = chars.len().checked_sub(prefix).ok_or_else(malformed)?;
    if !VALID_DIGITS.contains(&(digits as u8)) {
        return Err(malformed());
    }

    let mut e: i64 = 0;
    let mut n: i64 = 0;
    let mut rest = &chars[..];
    if system == GridSystem::Osgb36 {
        // The first letter names a 500 km block with a false origin one
        // block west and south-west of the 100 km letter grid.
        let (column, row) = letter_cell(chars[0]).ok_or_else(malformed)?;
        e += -1_000_000 + column * 500_000;
        n += -500_000 + row * 500_000;
        rest = &chars[1..];
    }
    let (column, row) = letter_cell(rest[0]).ok_or_else(malformed)?;
    e += column * 100_000;
    n += row * 100_000;

    let digit_chars = &rest[1..];
    if !digit_chars.iter().all(|c| c.is_ascii_digit()) {
        return Err(malformed());
    }
    let half = digits / 2;
    let scale = 10_i64.pow(5 - half as u32);
    let evalue: String = digit_chars[..half].iter().collect();
    let nvalue: String = digit_chars[half..].iter().collect();
    e += evalue.parse::<i64>().map_err(|_| malformed())? * scale;
    n += nvalue.parse::<i64>().map_err(|_| malformed())? * scale;

    Ok((e as i32, n as i32))
}

/// Convert eastings and northings back to a grid reference, truncating each
/// coordinate's five-digit representation to digits/2 characters. Fewer
/// digits mean a coarser reference, so truncation rather than rounding is
/// the right operation.
pub fn en_to_gridref(
    system: GridSystem,
    easting: f64,
    northing: f64,
    digits: u8,
) -> Result<String, LocationError> {
    if !VALID_DIGITS.contains(&digits) {
        return Err(LocationError::UnsupportedDigits(digits));
    }
    let out_of_grid = || LocationError::OutOfGrid {
        system: system.name(),
        easting,
        northing,
    };

    let (letters, e, n) = match system {
        GridSystem::Osgb36 => {
            let e = (easting + 1_000_000.0) as i64;
            let n = (northing + 500_000.0) as i64;
            if e < 0 || n < 0 {
                return Err(out_of_grid());
            }
            let first = grid_letter(4 - n / 500_000, e / 500_000).ok_or_else(out_of_grid)?;
            let second = grid_letter(4 - (n % 500_000) / 100_000, (e % 500_000) / 100_000)
                .ok_or_else(out_of_grid)?;
            (format!("{first}{second}"), e, n)
        }
        GridSystem::IrishGrid => {
            let e = easting as i64;
            let n = northing as i64;
            if e < 0 || n < 0 {
                return Err(out_of_grid());
            }
            let letter = grid_letter(4 - n / 100_000, e / 100_000).ok_or_else(out_of_grid)?;
            (letter.to_string(), e, n)
        }
    };

    let chars = (digits / 2) as usize;
    let estr = format!("{:05}", e % 100_000);
    let nstr = format!("{:05}", n % 100_000);
    Ok(format!("{}{}{}", letters, &estr[..chars], &nstr[..chars]))
}
