use candle_transformers::models::mobilenetv4;

/// Architecture family a registry entry is built with
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Variant {
    ConvSmall,
    ConvMedium,
    ConvLarge,
    HybridMedium,
    HybridLarge,
}

impl Variant {
    /// Candle configuration for this variant
    #[must_use]
    pub fn candle_config(self) -> mobilenetv4::Config {
        match self {
            Self::ConvSmall => mobilenetv4::Config::small(),
            Self::ConvMedium => mobilenetv4::Config::medium(),
            Self::ConvLarge => mobilenetv4::Config::large(),
            Self::HybridMedium => mobilenetv4::Config::hybrid_medium(),
            Self::HybridLarge => mobilenetv4::Config::hybrid_large(),
        }
    }
}

/// Information about a pre-trained feature extractor
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BaseModelInfo {
    pub name: &'static str,
    pub variant: Variant,
    pub native_resolution: usize,
    pub parameters: &'static str,
    pub description: &'static str,
    pub recommended: bool,
    pub hf_repo: &'static str,
    pub hf_revision: &'static str,
    pub weights_file: &'static str,
}

/// Registry of available feature extractors (ImageNet-1k weights from timm)
pub const MODELS: &[BaseModelInfo] = &[
    BaseModelInfo {
        name: "mobilenetv4-small",
        variant: Variant::ConvSmall,
        native_resolution: 224,
        parameters: "3.8M",
        description: "Smallest download, fast in the browser",
        recommended: true,
        hf_repo: "timm/mobilenetv4_conv_small.e2400_r224_in1k",
        hf_revision: "main",
        weights_file: "model.safetensors",
    },
    BaseModelInfo {
        name: "mobilenetv4-medium",
        variant: Variant::ConvMedium,
        native_resolution: 256,
        parameters: "9.7M",
        description: "Balanced size and accuracy",
        recommended: false,
        hf_repo: "timm/mobilenetv4_conv_medium.e500_r256_in1k",
        hf_revision: "main",
        weights_file: "model.safetensors",
    },
    BaseModelInfo {
        name: "mobilenetv4-large",
        variant: Variant::ConvLarge,
        native_resolution: 384,
        parameters: "32.6M",
        description: "Better features, large download",
        recommended: false,
        hf_repo: "timm/mobilenetv4_conv_large.e600_r384_in1k",
        hf_revision: "main",
        weights_file: "model.safetensors",
    },
    BaseModelInfo {
        name: "mobilenetv4-hybrid-medium",
        variant: Variant::HybridMedium,
        native_resolution: 256,
        parameters: "11.1M",
        description: "Attention blocks, medium size",
        recommended: false,
        hf_repo: "timm/mobilenetv4_hybrid_medium.ix_e550_r256_in1k",
        hf_revision: "main",
        weights_file: "model.safetensors",
    },
    BaseModelInfo {
        name: "mobilenetv4-hybrid-large",
        variant: Variant::HybridLarge,
        native_resolution: 384,
        parameters: "37.8M",
        description: "Attention blocks, largest download",
        recommended: false,
        hf_repo: "timm/mobilenetv4_hybrid_large.e600_r384_in1k",
        hf_revision: "main",
        weights_file: "model.safetensors",
    },
];

impl BaseModelInfo {
    /// Find model by name
    #[must_use]
    pub fn find(name: &str) -> Option<&'static Self> {
        MODELS.iter().find(|m| m.name == name)
    }

    /// Get all model names
    #[must_use]
    pub fn all_names() -> Vec<&'static str> {
        MODELS.iter().map(|m| m.name).collect()
    }

    /// Get recommended model
    #[must_use]
    pub fn recommended() -> &'static Self {
        MODELS.iter().find(|m| m.recommended).unwrap_or(&MODELS[0])
    }

    /// Find closest match using Levenshtein distance
    #[must_use]
    pub fn suggest(name: &str) -> Option<&'static str> {
        if name.is_empty() {
            return None;
        }

        Self::all_names()
            .into_iter()
            .map(|candidate| (candidate, levenshtein_distance(name, candidate)))
            .min_by_key(|(_, dist)| *dist)
            .filter(|(_, dist)| *dist <= 2) // Only suggest if within 2 edits
            .map(|(model_name, _)| model_name)
    }
}

/// Calculate Levenshtein distance between two strings
fn levenshtein_distance(s1: &str, s2: &str) -> usize {
    let s1_chars: Vec<char> = s1.chars().collect();
    let s2_chars: Vec<char> = s2.chars().collect();

    if s1_chars.is_empty() {
        return s2_chars.len();
    }
    if s2_chars.is_empty() {
        return s1_chars.len();
    }

    // Single rolling row
    let mut row: Vec<usize> = (0..=s2_chars.len()).collect();

    for (i, c1) in s1_chars.iter().enumerate() {
        let mut diagonal = row[0];
        row[0] = i + 1;
        for (j, c2) in s2_chars.iter().enumerate() {
            let cost = usize::from(c1 != c2);
            let next = (row[j + 1] + 1).min(row[j] + 1).min(diagonal + cost);
            diagonal = row[j + 1];
            row[j + 1] = next;
        }
    }

    row[s2_chars.len()]
}
