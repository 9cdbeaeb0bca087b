use serde::{Deserialize, Serialize};

const CLASSIC_PALETTE: [&str; 10] = [
    "#4E79A7", "#F28E2B", "#E15759", "#76B7B2", "#59A14F", "#EDC948", "#B07AA1", "#FF9DA7",
    "#9C755F", "#BAB0AC",
];

const MODERN_PALETTE: [&str; 10] = [
    "#5B8FF9", "#5AD8A6", "#5D7092", "#F6BD16", "#E8684A", "#6DC8EC", "#9270CA", "#FF9D4D",
    "#269A99", "#FF99C3",
];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Theme {
    pub font_family: String,
    pub text_color: String,
    pub muted_text_color: String,
    pub background: String,
    pub line_color: String,
    pub focus_line_color: String,
    pub dimmed_line_color: String,
    pub node_stroke: String,
    pub node_palette: Vec<String>,
    pub unassigned_node_color: String,
    /// Inner and outer stops of the macro-node gradient for narrative communities.
    pub narrative_gradient: (String, String),
    /// Inner and outer stops for communities outside the narrative.
    pub background_gradient: (String, String),
    pub section_background: String,
    pub section_border: String,
    pub title_color: String,
}

impl Theme {
    pub fn classic() -> Self {
        Self {
            font_family: "Georgia, \"Times New Roman\", serif".to_string(),
            text_color: "#222222".to_string(),
            muted_text_color: "#666666".to_string(),
            background: "#FFFFFF".to_string(),
            line_color: "#555555".to_string(),
            focus_line_color: "#111111".to_string(),
            dimmed_line_color: "#CCCCCC".to_string(),
            node_stroke: "#FFFFFF".to_string(),
            node_palette: CLASSIC_PALETTE.iter().map(|c| c.to_string()).collect(),
            unassigned_node_color: "#9E9E9E".to_string(),
            narrative_gradient: ("#FFE9A8".to_string(), "#E0A800".to_string()),
            background_gradient: ("#EEF1F5".to_string(), "#B8C2CF".to_string()),
            section_background: "#FFFDF6".to_string(),
            section_border: "#D8CBA6".to_string(),
            title_color: "#111111".to_string(),
        }
    }

    pub fn modern() -> Self {
        Self {
            font_family: "Inter, Segoe UI, system-ui, -apple-system, sans-serif".to_string(),
            text_color: "#1C2430".to_string(),
            muted_text_color: "#5B6577".to_string(),
            background: "#FFFFFF".to_string(),
            line_color: "#7A8AA6".to_string(),
            focus_line_color: "#1C2430".to_string(),
            dimmed_line_color: "#DDE3EC".to_string(),
            node_stroke: "#FFFFFF".to_string(),
            node_palette: MODERN_PALETTE.iter().map(|c| c.to_string()).collect(),
            unassigned_node_color: "#A3ADBD".to_string(),
            narrative_gradient: ("#DCE8FF".to_string(), "#5B8FF9".to_string()),
            background_gradient: ("#F5F7FA".to_string(), "#C7D2E5".to_string()),
            section_background: "#F8FAFF".to_string(),
            section_border: "#C7D2E5".to_string(),
            title_color: "#1C2430".to_string(),
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "classic" | "default" => Some(Self::classic()),
            "modern" => Some(Self::modern()),
            _ => None,
        }
    }

    /// Fill for the community at `index` in community order.
    pub fn community_color(&self, index: usize) -> &str {
        if self.node_palette.is_empty() {
            return &self.unassigned_node_color;
        }
        &self.node_palette[index % self.node_palette.len()]
    }
}

impl Default for Theme {
    fn default() -> Self {
        Self::classic()
    }
}
