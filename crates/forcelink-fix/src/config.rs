//! Keyword surfaces for the two fix modes, parsed from the host's argument
//! tokens.

use crate::error::{FixError, FixResult};

/// Arguments of the dense per-step mode: `[every <uint>] [dipole]`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct DenseArgs {
    /// Exchange with the controller every this many steps. 1 by default;
    /// 0 leaves the fix inert.
    pub every: u64,
    pub dipole: bool,
}

impl Default for DenseArgs {
    fn default() -> Self {
        Self {
            every: 1,
            dipole: false,
        }
    }
}

impl DenseArgs {
    pub fn parse(args: &[&str]) -> FixResult<Self> {
        let mut parsed = Self::default();
        parse_keywords(args, &mut parsed.every, &mut parsed.dipole)?;
        Ok(parsed)
    }
}

/// Arguments of the force-field mode:
/// `<Nx_bins> <Ny_bins> <Nz_bins> [every <uint>] [dipole]`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FieldArgs {
    /// Bin counts per axis; the grid holds one more node than bins per axis.
    pub bins: [u64; 3],
    /// Refresh the grid every this many steps. 0 (the default) initializes
    /// once and never refreshes.
    pub every: u64,
    pub dipole: bool,
}

impl FieldArgs {
    pub fn parse(args: &[&str]) -> FixResult<Self> {
        if args.len() < 3 {
            return Err(FixError::Malformed("missing x/y/z bin counts".into()));
        }
        let bins = [
            parse_uint(args[0])?,
            parse_uint(args[1])?,
            parse_uint(args[2])?,
        ];
        let mut parsed = Self {
            bins,
            every: 0,
            dipole: false,
        };
        parse_keywords(&args[3..], &mut parsed.every, &mut parsed.dipole)?;
        Ok(parsed)
    }
}

fn parse_keywords(args: &[&str], every: &mut u64, dipole: &mut bool) -> FixResult<()> {
    let mut i = 0;
    while i < args.len() {
        match args[i] {
            "every" => {
                i += 1;
                let token = args
                    .get(i)
                    .ok_or_else(|| FixError::Malformed("missing argument for `every'".into()))?;
                *every = parse_uint(token)?;
            }
            "dipole" => *dipole = !*dipole,
            unknown => {
                return Err(FixError::Malformed(format!("unknown keyword `{unknown}'")));
            }
        }
        i += 1;
    }
    Ok(())
}

fn parse_uint(token: &str) -> FixResult<u64> {
    token.parse().map_err(|_| {
        FixError::Malformed(format!("expected an unsigned integer, found `{token}'"))
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dense_defaults() {
        let args = DenseArgs::parse(&[]).expect("parse");
        assert_eq!(args.every, 1);
        assert!(!args.dipole);
    }

    #[test]
    fn dense_every_and_dipole() {
        let args = DenseArgs::parse(&["every", "5", "dipole"]).expect("parse");
        assert_eq!(args.every, 5);
        assert!(args.dipole);
    }

    #[test]
    fn dipole_is_a_toggle() {
        let args = DenseArgs::parse(&["dipole", "dipole"]).expect("parse");
        assert!(!args.dipole);
    }

    #[test]
    fn dense_rejects_unknown_keyword() {
        let err = DenseArgs::parse(&["speed", "9"]).unwrap_err();
        assert!(err.to_string().contains("unknown keyword"));
    }

    #[test]
    fn dense_rejects_missing_every_argument() {
        assert!(DenseArgs::parse(&["every"]).is_err());
    }

    #[test]
    fn dense_rejects_malformed_numeral() {
        assert!(DenseArgs::parse(&["every", "often"]).is_err());
        assert!(DenseArgs::parse(&["every", "-3"]).is_err());
    }

    #[test]
    fn field_parses_bins_and_keywords() {
        let args = FieldArgs::parse(&["4", "8", "16", "every", "100"]).expect("parse");
        assert_eq!(args.bins, [4, 8, 16]);
        assert_eq!(args.every, 100);
        assert!(!args.dipole);
    }

    #[test]
    fn field_defaults_to_initialize_once() {
        let args = FieldArgs::parse(&["2", "2", "2"]).expect("parse");
        assert_eq!(args.every, 0);
    }

    #[test]
    fn field_requires_three_bin_counts() {
        assert!(FieldArgs::parse(&[]).is_err());
        assert!(FieldArgs::parse(&["4", "8"]).is_err());
    }

    #[test]
    fn field_rejects_trailing_garbage() {
        assert!(FieldArgs::parse(&["4", "8", "16", "fast"]).is_err());
    }
}
