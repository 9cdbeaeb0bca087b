use crate::layout::Orientation;
use crate::overrides::PositionOverrides;
use crate::theme::Theme;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

/// Tunables of the physics solver. Defaults follow the layout the print view
/// has always used; changing them changes every document's look.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct SolverConfig {
    pub link_distance: f32,
    pub intra_link_strength: f32,
    pub inter_link_strength: f32,
    pub charge_strength: f32,
    pub charge_distance_min: f32,
    pub collide_radius: f32,
    pub collide_strength: f32,
    pub center_strength: f32,
    pub anchor_strength: f32,
    pub unanchored_strength: f32,
    pub max_iterations: usize,
    pub alpha_min: f32,
    pub alpha_decay: f32,
    pub velocity_decay: f32,
    pub initial_jitter: f32,
    pub seed: Option<u64>,
}

impl Default for SolverConfig {
    fn default() -> Self {
        Self {
            link_distance: 50.0,
            intra_link_strength: 0.1,
            inter_link_strength: 0.001,
            charge_strength: -300.0,
            charge_distance_min: 1.0,
            collide_radius: 30.0,
            collide_strength: 1.0,
            center_strength: 0.05,
            anchor_strength: 0.15,
            unanchored_strength: 0.0,
            max_iterations: 2000,
            alpha_min: 0.001,
            // alpha reaches alpha_min after ~300 ticks
            alpha_decay: 1.0 - 0.001f32.powf(1.0 / 300.0),
            velocity_decay: 0.4,
            initial_jitter: 10.0,
            seed: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct PlannerConfig {
    /// Primary-axis coordinate of the first ordered community, as a fraction
    /// of the canvas span along that axis.
    pub start_fraction: f32,
    pub base_spacing: f32,
    pub min_spacing: f32,
    pub max_spacing: f32,
    /// Community size at which `base_spacing` applies unscaled.
    pub spacing_reference_size: f32,
    /// Cross-axis fraction for odd orders; even orders use `1 - cross_fraction`.
    pub cross_fraction: f32,
    /// Cross-axis fraction for communities outside the narrative.
    pub outer_cross_fraction: f32,
}

impl Default for PlannerConfig {
    fn default() -> Self {
        Self {
            start_fraction: 0.1,
            base_spacing: 200.0,
            min_spacing: 120.0,
            max_spacing: 480.0,
            spacing_reference_size: 10.0,
            cross_fraction: 0.2,
            outer_cross_fraction: 0.05,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct EdgeFalloffConfig {
    pub min_opacity: f32,
    pub max_opacity: f32,
    pub min_width: f32,
    pub max_width: f32,
    pub decay_exponent: f32,
    pub bell_center: f32,
    pub bell_width: f32,
    pub bell_weight: f32,
    pub dimmed_opacity: f32,
    pub dimmed_width: f32,
    pub focus_opacity: f32,
    pub focus_width: f32,
}

impl Default for EdgeFalloffConfig {
    fn default() -> Self {
        Self {
            min_opacity: 0.12,
            max_opacity: 0.85,
            min_width: 0.4,
            max_width: 2.0,
            decay_exponent: 2.0,
            bell_center: 0.5,
            bell_width: 0.18,
            bell_weight: 0.35,
            dimmed_opacity: 0.08,
            dimmed_width: 0.5,
            focus_opacity: 1.0,
            focus_width: 2.4,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct NodeSizeConfig {
    pub min_radius: f32,
    pub link_scale: f32,
    /// Upper bound for detail nodes; also the radius the viewport calculator
    /// pads node coordinates with.
    pub max_radius: f32,
    pub macro_min_radius: f32,
    pub macro_scale: f32,
    pub macro_max_radius: f32,
    pub unfocused_opacity: f32,
    pub focus_label_scale: f32,
}

impl Default for NodeSizeConfig {
    fn default() -> Self {
        Self {
            min_radius: 4.0,
            link_scale: 1.5,
            max_radius: 18.0,
            macro_min_radius: 16.0,
            macro_scale: 4.0,
            macro_max_radius: 64.0,
            unfocused_opacity: 0.2,
            focus_label_scale: 1.3,
        }
    }
}

impl NodeSizeConfig {
    /// Radius of a detail node with `link_count` neighbor links.
    pub fn detail_radius(&self, link_count: usize) -> f32 {
        let radius = self.min_radius + self.link_scale * (link_count as f32).sqrt();
        radius.clamp(self.min_radius, self.max_radius.max(self.min_radius))
    }

    /// Radius of a community macro-node with `members` members.
    pub fn macro_radius(&self, members: usize) -> f32 {
        let radius = self.macro_min_radius + self.macro_scale * (members as f32).sqrt();
        radius.clamp(
            self.macro_min_radius,
            self.macro_max_radius.max(self.macro_min_radius),
        )
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct OverlayConfig {
    pub section_width_fraction: f32,
    pub section_aspect: f32,
    pub section_gap: f32,
    pub title_width_fraction: f32,
    pub title_height: f32,
    pub title_margin_fraction: f32,
    pub min_width: f32,
    pub min_height: f32,
    pub padding_fraction: f32,
    pub text_padding: f32,
}

impl Default for OverlayConfig {
    fn default() -> Self {
        Self {
            section_width_fraction: 0.2,
            section_aspect: 0.6,
            section_gap: 24.0,
            title_width_fraction: 0.5,
            title_height: 56.0,
            title_margin_fraction: 0.03,
            min_width: 60.0,
            min_height: 40.0,
            padding_fraction: 0.05,
            text_padding: 10.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct LabelConfig {
    pub edge_min_font: f32,
    pub edge_max_font: f32,
    /// Share of the edge length a label may occupy.
    pub edge_fill_ratio: f32,
    pub label_line_height: f32,
    /// Skip system font lookup and use the built-in width table.
    pub fast_text_metrics: bool,
}

impl Default for LabelConfig {
    fn default() -> Self {
        Self {
            edge_min_font: 5.0,
            edge_max_font: 11.0,
            edge_fill_ratio: 0.8,
            label_line_height: 1.3,
            fast_text_metrics: false,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct LayoutConfig {
    pub solver: SolverConfig,
    pub planner: PlannerConfig,
    pub edges: EdgeFalloffConfig,
    pub nodes: NodeSizeConfig,
    pub overlays: OverlayConfig,
    pub labels: LabelConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RenderConfig {
    pub width: f32,
    pub height: f32,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            width: 1200.0,
            height: 800.0,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub theme: Theme,
    pub layout: LayoutConfig,
    pub render: RenderConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            theme: Theme::classic(),
            layout: LayoutConfig::default(),
            render: RenderConfig::default(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum CommunityDisplay {
    #[default]
    Hidden,
    NarrativeOnly,
    All,
}

impl CommunityDisplay {
    pub fn shows_macro_nodes(self) -> bool {
        !matches!(self, CommunityDisplay::Hidden)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DetailDisplay {
    #[default]
    All,
    NarrativeOnly,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct FontSizes {
    pub node_label: f32,
    pub community_label: f32,
    pub section_title: f32,
    pub section_body: f32,
    pub workspace_title: f32,
}

impl Default for FontSizes {
    fn default() -> Self {
        Self {
            node_label: 8.0,
            community_label: 12.0,
            section_title: 13.0,
            section_body: 10.0,
            workspace_title: 24.0,
        }
    }
}

/// Per-document settings supplied by the caller on every pass.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct LayoutSettings {
    pub orientation: Orientation,
    pub community_display: CommunityDisplay,
    pub detail_display: DetailDisplay,
    pub show_story_text: bool,
    pub show_workspace_title: bool,
    pub workspace_title: String,
    pub font_sizes: FontSizes,
    /// Community id -> fill color, overriding the theme palette.
    pub community_colors: BTreeMap<String, String>,
    pub overrides: PositionOverrides,
}

impl Default for LayoutSettings {
    fn default() -> Self {
        Self {
            orientation: Orientation::Vertical,
            community_display: CommunityDisplay::Hidden,
            detail_display: DetailDisplay::All,
            show_story_text: true,
            show_workspace_title: true,
            workspace_title: String::new(),
            font_sizes: FontSizes::default(),
            community_colors: BTreeMap::new(),
            overrides: PositionOverrides::default(),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ThemeVariables {
    font_family: Option<String>,
    text_color: Option<String>,
    muted_text_color: Option<String>,
    background: Option<String>,
    line_color: Option<String>,
    focus_line_color: Option<String>,
    dimmed_line_color: Option<String>,
    node_stroke: Option<String>,
    node_palette: Option<Vec<String>>,
    unassigned_node_color: Option<String>,
    section_background: Option<String>,
    section_border: Option<String>,
    title_color: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ConfigFile {
    theme: Option<String>,
    theme_variables: Option<ThemeVariables>,
    layout: Option<LayoutConfig>,
    width: Option<f32>,
    height: Option<f32>,
}

fn parse_config_file(contents: &str) -> anyhow::Result<ConfigFile> {
    match serde_json::from_str::<ConfigFile>(contents) {
        Ok(parsed) => Ok(parsed),
        Err(json_err) => json5::from_str::<ConfigFile>(contents)
            .map_err(|err| anyhow::anyhow!("invalid config ({json_err}; as JSON5: {err})")),
    }
}

pub fn load_config(path: Option<&Path>) -> anyhow::Result<Config> {
    let mut config = Config::default();
    let Some(path) = path else {
        return Ok(config);
    };

    let contents = std::fs::read_to_string(path)?;
    let parsed = parse_config_file(&contents)?;

    if let Some(theme) = parsed.theme.as_deref().and_then(Theme::from_name) {
        config.theme = theme;
    }

    if let Some(vars) = parsed.theme_variables {
        if let Some(v) = vars.font_family {
            config.theme.font_family = v;
        }
        if let Some(v) = vars.text_color {
            config.theme.text_color = v;
        }
        if let Some(v) = vars.muted_text_color {
            config.theme.muted_text_color = v;
        }
        if let Some(v) = vars.background {
            config.theme.background = v;
        }
        if let Some(v) = vars.line_color {
            config.theme.line_color = v;
        }
        if let Some(v) = vars.focus_line_color {
            config.theme.focus_line_color = v;
        }
        if let Some(v) = vars.dimmed_line_color {
            config.theme.dimmed_line_color = v;
        }
        if let Some(v) = vars.node_stroke {
            config.theme.node_stroke = v;
        }
        if let Some(v) = vars.node_palette
            && !v.is_empty()
        {
            config.theme.node_palette = v;
        }
        if let Some(v) = vars.unassigned_node_color {
            config.theme.unassigned_node_color = v;
        }
        if let Some(v) = vars.section_background {
            config.theme.section_background = v;
        }
        if let Some(v) = vars.section_border {
            config.theme.section_border = v;
        }
        if let Some(v) = vars.title_color {
            config.theme.title_color = v;
        }
    }

    if let Some(layout) = parsed.layout {
        config.layout = layout;
    }
    if let Some(v) = parsed.width {
        config.render.width = v;
    }
    if let Some(v) = parsed.height {
        config.render.height = v;
    }

    Ok(config)
}
