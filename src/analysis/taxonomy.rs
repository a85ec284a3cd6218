//! Mapping from composite RFM codes to named customer segments

/// Strategy that names the segment for a composite RFM code
pub trait SegmentTaxonomy {
    /// Segment label for a code such as `"434"`
    fn segment_for(&self, code: &str) -> &str;

    /// Every label this taxonomy can produce
    fn labels(&self) -> Vec<&str>;
}

/// The ten standard retail segments
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Segment {
    Champions,
    LoyalCustomers,
    PotentialLoyalists,
    NewCustomers,
    Promising,
    NeedAttention,
    AboutToSleep,
    AtRisk,
    CannotLoseThem,
    Lost,
}

impl Segment {
    pub const ALL: [Self; 10] = [
        Self::Champions,
        Self::LoyalCustomers,
        Self::PotentialLoyalists,
        Self::NewCustomers,
        Self::Promising,
        Self::NeedAttention,
        Self::AboutToSleep,
        Self::AtRisk,
        Self::CannotLoseThem,
        Self::Lost,
    ];

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Champions => "Champions",
            Self::LoyalCustomers => "Loyal Customers",
            Self::PotentialLoyalists => "Potential Loyalists",
            Self::NewCustomers => "New Customers",
            Self::Promising => "Promising",
            Self::NeedAttention => "Need Attention",
            Self::AboutToSleep => "About to Sleep",
            Self::AtRisk => "At Risk",
            Self::CannotLoseThem => "Cannot Lose Them",
            Self::Lost => "Lost",
        }
    }

    /// Codes explicitly assigned to this segment; empty for the fallback
    #[must_use]
    pub fn codes(self) -> &'static [&'static str] {
        match self {
            Self::Champions => &["444", "434", "443", "344"],
            Self::LoyalCustomers => &["334", "343", "333", "324"],
            Self::PotentialLoyalists => &["431", "441", "432"],
            Self::NewCustomers => &["142", "143", "144", "241", "242"],
            Self::Promising => &["313", "314", "323", "413", "414", "423"],
            Self::NeedAttention => &["231", "232", "233", "321", "322"],
            Self::AboutToSleep => &["131", "132", "141", "221", "222"],
            Self::AtRisk => &["112", "113", "121", "122", "211", "212"],
            Self::CannotLoseThem => &["123", "124", "213", "214", "223", "224"],
            Self::Lost => &[],
        }
    }
}

impl std::fmt::Display for Segment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Standard code table; unmatched codes fall back to [`Segment::Lost`]
#[derive(Debug, Clone, Copy, Default)]
pub struct StandardTaxonomy;

impl StandardTaxonomy {
    #[must_use]
    pub fn segment(code: &str) -> Segment {
        Segment::ALL
            .into_iter()
            .find(|segment| segment.codes().contains(&code))
            .unwrap_or(Segment::Lost)
    }
}

impl SegmentTaxonomy for StandardTaxonomy {
    fn segment_for(&self, code: &str) -> &str {
        Self::segment(code).as_str()
    }

    fn labels(&self) -> Vec<&str> {
        Segment::ALL.iter().map(|s| s.as_str()).collect()
    }
}
