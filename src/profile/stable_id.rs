//! Normalization of sample column headers to stable sample ids.

use regex::Regex;

lazy_static::lazy_static! {
    /// TCGA barcode, capturing participant and sample type code.
    static ref TCGA_BARCODE: Regex =
        Regex::new(r"^(TCGA-\w\w-\w\w\w\w-(\d\d))[A-Z]?.*$").expect("invalid regex in source code");
}

/// Range of TCGA sample type codes denoting normal tissue.
const NORMAL_SAMPLE_TYPES: std::ops::RangeInclusive<u32> = 10..=19;

/// Stable sample id for a sample column header.
///
/// TCGA barcodes are truncated after the sample type code; other ids are kept.
pub fn sample_id(header: &str) -> String {
    match TCGA_BARCODE.captures(header) {
        Some(captures) => captures[1].to_string(),
        None => header.to_string(),
    }
}

/// Whether the sample column header names a normal sample.
pub fn is_normal(header: &str) -> bool {
    TCGA_BARCODE
        .captures(header)
        .and_then(|captures| captures[2].parse::<u32>().ok())
        .map(|code| NORMAL_SAMPLE_TYPES.contains(&code))
        .unwrap_or(false)
}

#[cfg(test)]
mod test {
    #[rstest::rstest]
    #[case("TCGA-A1-A0SB-01", "TCGA-A1-A0SB-01")]
    #[case("TCGA-A1-A0SB-01A-11D-A142-09", "TCGA-A1-A0SB-01")]
    #[case("TCGA-A1-A0SB-11B", "TCGA-A1-A0SB-11")]
    #[case("S-1", "S-1")]
    #[case("tcga-a1-a0sb-01", "tcga-a1-a0sb-01")]
    fn sample_id(#[case] header: &str, #[case] expected: &str) {
        assert_eq!(super::sample_id(header), expected);
    }

    #[rstest::rstest]
    #[case("TCGA-A1-A0SB-01", false)]
    #[case("TCGA-A1-A0SB-10", true)]
    #[case("TCGA-A1-A0SB-11A-11D", true)]
    #[case("TCGA-A1-A0SB-19", true)]
    #[case("TCGA-A1-A0SB-20", false)]
    #[case("NORMAL-11", false)]
    fn is_normal(#[case] header: &str, #[case] expected: bool) {
        assert_eq!(super::is_normal(header), expected);
    }
}
