/// List-filter sentinel meaning "every section".
pub const ALL_SECTIONS: &str = "all";

/// Page region a snippet belongs to.
///
/// [`Section::label`] is the Japanese display label, which is also the value
/// stored in the `section` column. The store does not enforce membership, so rows
/// carry a plain string and are classified with [`SectionBucket::classify`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Section {
    Header,
    Hero,
    CompanyOverview,
    Services,
    Pricing,
    CaseStudies,
    Testimonials,
    Faq,
    Contact,
    Footer,
}

impl Section {
    /// Sidebar order.
    pub const ALL: [Section; 10] = [
        Section::Header,
        Section::Hero,
        Section::CompanyOverview,
        Section::Services,
        Section::Pricing,
        Section::CaseStudies,
        Section::Testimonials,
        Section::Faq,
        Section::Contact,
        Section::Footer,
    ];

    pub fn label(self) -> &'static str {
        match self {
            Section::Header => "ヘッダー",
            Section::Hero => "ヒーローセクション",
            Section::CompanyOverview => "会社概要セクション",
            Section::Services => "サービス紹介セクション",
            Section::Pricing => "料金・価格セクション",
            Section::CaseStudies => "事例セクション",
            Section::Testimonials => "お客様の声セクション",
            Section::Faq => "よくある質問セクション",
            Section::Contact => "お問い合わせセクション",
            Section::Footer => "フッター",
        }
    }

    /// Parse a stored label. Accepts the current labels and the shorter
    /// labels written by earlier versions of the admin form.
    pub fn from_label(label: &str) -> Option<Self> {
        let label = label.trim();
        if let Some(section) = Self::ALL.into_iter().find(|s| s.label() == label) {
            return Some(section);
        }
        match label {
            "会社概要" => Some(Section::CompanyOverview),
            "サービス紹介" => Some(Section::Services),
            "料金・価格" => Some(Section::Pricing),
            "事例・実績" => Some(Section::CaseStudies),
            "お客様の声" => Some(Section::Testimonials),
            "よくある質問" => Some(Section::Faq),
            "お問い合わせ" => Some(Section::Contact),
            _ => None,
        }
    }
}

/// Display bucket for a stored `section` value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SectionBucket {
    Known(Section),
    Uncategorized,
}

impl SectionBucket {
    pub fn classify(label: &str) -> Self {
        Section::from_label(label).map_or(SectionBucket::Uncategorized, SectionBucket::Known)
    }
}

/// Whether a list request's section parameter should become a filter.
///
/// Absent, blank, and the `all` sentinel all mean "no filter".
pub fn section_filter(requested: Option<&str>) -> Option<&str> {
    requested
        .map(str::trim)
        .filter(|s| !s.is_empty() && *s != ALL_SECTIONS)
}
