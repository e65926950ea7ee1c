use std::fmt::{Display, Formatter};
use std::path::Path;

use indicatif::{ProgressBar, ProgressStyle};
use log::info;

pub(crate) const TAB: char = '\t';
pub(crate) const MISSING_SYMBOL: &'static str = "*";

pub(crate) fn create_out_directory<T: AsRef<std::ffi::OsStr>>(
    raw_path: T,
) -> anyhow::Result<()> {
    if let Some(p) = Path::new(&raw_path).parent() {
        if !p.exists() && p != Path::new("") {
            info!("creating directory at {p:?}");
            std::fs::create_dir_all(p)?;
        }
    }
    Ok(())
}

pub(crate) fn get_ticker() -> ProgressBar {
    let ticker = ProgressBar::new_spinner();
    ticker.set_style(ProgressStyle::with_template("> {pos} {msg}").unwrap());
    ticker
}

#[derive(Debug, PartialEq, Eq, Copy, Clone, Hash, Default, PartialOrd, Ord)]
pub enum Strand {
    #[default]
    Positive,
    Negative,
}

impl Strand {
    pub fn to_char(&self) -> char {
        match self {
            Strand::Positive => '+',
            Strand::Negative => '-',
        }
    }
}

impl Display for Strand {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.to_char())
    }
}

#[cfg(test)]
mod util_tests {
    use super::Strand;

    #[test]
    fn test_strand_display() {
        assert_eq!(Strand::Positive.to_string(), "+");
        assert_eq!(Strand::Negative.to_string(), "-");
    }
}
