// src/models/catalog.rs

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

// =============================================================================
//  ENUMS
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    Indoor,
    Outdoor,
}

impl Environment {
    pub fn as_str(&self) -> &'static str {
        match self {
            Environment::Indoor => "indoor",
            Environment::Outdoor => "outdoor",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Environment::Indoor => "Для помещений",
            Environment::Outdoor => "Уличный",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum Availability {
    InStock,
    Preorder,
}

impl Availability {
    pub fn as_str(&self) -> &'static str {
        match self {
            Availability::InStock => "in_stock",
            Availability::Preorder => "preorder",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Availability::InStock => "В наличии",
            Availability::Preorder => "Под заказ",
        }
    }
}

/// Which half of the catalog is being browsed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum CatalogType {
    #[default]
    Modules,
    Displays,
}

impl CatalogType {
    pub const ALL: [CatalogType; 2] = [CatalogType::Modules, CatalogType::Displays];

    pub fn as_str(&self) -> &'static str {
        match self {
            CatalogType::Modules => "modules",
            CatalogType::Displays => "displays",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            CatalogType::Modules => "Модули",
            CatalogType::Displays => "Готовые экраны",
        }
    }

    pub fn from_param(value: &str) -> Option<Self> {
        match value.trim() {
            "modules" => Some(CatalogType::Modules),
            "displays" => Some(CatalogType::Displays),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
pub enum SortMode {
    #[default]
    #[serde(rename = "name_asc")]
    NameAsc,
    #[serde(rename = "price_asc")]
    PriceAsc,
    #[serde(rename = "price_desc")]
    PriceDesc,
    #[serde(rename = "pitch_asc")]
    PitchAsc,
}

impl SortMode {
    pub const ALL: [SortMode; 4] = [
        SortMode::PitchAsc,
        SortMode::PriceAsc,
        SortMode::PriceDesc,
        SortMode::NameAsc,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            SortMode::NameAsc => "name_asc",
            SortMode::PriceAsc => "price_asc",
            SortMode::PriceDesc => "price_desc",
            SortMode::PitchAsc => "pitch_asc",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            SortMode::NameAsc => "По названию",
            SortMode::PriceAsc => "По цене: по возрастанию",
            SortMode::PriceDesc => "По цене: по убыванию",
            SortMode::PitchAsc => "По шагу пикселя",
        }
    }

    pub fn from_param(value: &str) -> Option<Self> {
        match value.trim() {
            "name_asc" => Some(SortMode::NameAsc),
            "price_asc" => Some(SortMode::PriceAsc),
            "price_desc" => Some(SortMode::PriceDesc),
            "pitch_asc" => Some(SortMode::PitchAsc),
            _ => None,
        }
    }
}

/// A filterable product attribute. Declaration order is the order facets are
/// rendered and serialized in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum Facet {
    Environment,
    Pitch,
    Flexibility,
    Technology,
    RefreshRate,
    Size,
    Availability,
    Badges,
    Series,
    PixelType,
    ViewAngle,
    Brightness,
    IpRating,
    ScreenResolution,
}

impl Facet {
    pub const ALL: [Facet; 14] = [
        Facet::Environment,
        Facet::Pitch,
        Facet::Flexibility,
        Facet::Technology,
        Facet::RefreshRate,
        Facet::Size,
        Facet::Availability,
        Facet::Badges,
        Facet::Series,
        Facet::PixelType,
        Facet::ViewAngle,
        Facet::Brightness,
        Facet::IpRating,
        Facet::ScreenResolution,
    ];

    /// Query-string key.
    pub fn key(&self) -> &'static str {
        match self {
            Facet::Environment => "env",
            Facet::Pitch => "pitch",
            Facet::Flexibility => "flex",
            Facet::Technology => "tech",
            Facet::RefreshRate => "refresh",
            Facet::Size => "size",
            Facet::Availability => "availability",
            Facet::Badges => "badges",
            Facet::Series => "series",
            Facet::PixelType => "pixel_type",
            Facet::ViewAngle => "view_angle",
            Facet::Brightness => "brightness",
            Facet::IpRating => "ip",
            Facet::ScreenResolution => "screen_resolution",
        }
    }

    pub fn from_key(key: &str) -> Option<Self> {
        Facet::ALL.into_iter().find(|facet| facet.key() == key)
    }

    pub fn title(&self) -> &'static str {
        match self {
            Facet::Environment => "Среда эксплуатации",
            Facet::Pitch => "Шаг пикселя",
            Facet::Flexibility => "Исполнение",
            Facet::Technology => "Технология",
            Facet::RefreshRate => "Частота обновления",
            Facet::Size => "Размер",
            Facet::Availability => "Наличие",
            Facet::Badges => "Метки",
            Facet::Series => "Серия",
            Facet::PixelType => "Тип пикселя",
            Facet::ViewAngle => "Угол обзора",
            Facet::Brightness => "Яркость",
            Facet::IpRating => "Степень защиты",
            Facet::ScreenResolution => "Разрешение",
        }
    }

    /// Values are numbers and must be ordered numerically, not lexically.
    pub fn is_numeric(&self) -> bool {
        matches!(self, Facet::Pitch | Facet::RefreshRate)
    }

    /// Human label for a raw facet value.
    pub fn value_label(&self, value: &str) -> String {
        match (self, value) {
            (Facet::Environment, "indoor") => Environment::Indoor.label().to_string(),
            (Facet::Environment, "outdoor") => Environment::Outdoor.label().to_string(),
            (Facet::Flexibility, "yes") => "Гибкий".to_string(),
            (Facet::Flexibility, "no") => "Жёсткий".to_string(),
            (Facet::Availability, "in_stock") => Availability::InStock.label().to_string(),
            (Facet::Availability, "preorder") => Availability::Preorder.label().to_string(),
            (Facet::Pitch, v) => format!("P{v}"),
            (Facet::RefreshRate, v) => format!("{v} Гц"),
            (_, v) => v.to_string(),
        }
    }
}

// =============================================================================
//  PRODUCTS
// =============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModuleProduct {
    pub id: String,
    pub name: String,
    pub environment: Environment,
    pub pitch_mm: f64,
    #[serde(default)]
    pub is_flexible: bool,
    #[serde(default)]
    pub tech: Vec<String>,
    #[serde(default)]
    pub series: Option<String>,
    #[serde(default)]
    pub refresh_hz: Option<u32>,
    #[serde(default)]
    pub size_mm: Option<String>,
    #[serde(default)]
    pub availability: Option<Availability>,
    #[serde(default)]
    pub price_rub: Option<Decimal>,
    #[serde(default)]
    pub badges: Vec<String>,
    #[serde(default)]
    pub image: Option<String>,
    #[serde(default)]
    pub short_description: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DisplayProduct {
    pub id: String,
    pub name: String,
    pub environment: Environment,
    pub pitch_mm: f64,
    #[serde(default)]
    pub series: Option<String>,
    #[serde(default)]
    pub pixel_type: Option<String>,
    #[serde(default)]
    pub view_angle: Option<String>,
    #[serde(default)]
    pub brightness: Option<String>,
    #[serde(default)]
    pub ip: Option<String>,
    #[serde(default)]
    pub screen_resolution: Option<String>,
    #[serde(default)]
    pub refresh_hz: Option<u32>,
    #[serde(default)]
    pub size_mm: Option<String>,
    #[serde(default)]
    pub availability: Option<Availability>,
    #[serde(default)]
    pub price_rub: Option<Decimal>,
    #[serde(default)]
    pub badges: Vec<String>,
    #[serde(default)]
    pub image: Option<String>,
    #[serde(default)]
    pub short_description: Option<String>,
}

/// A catalog entry. Modules and displays share most attributes but each
/// carries fields the other lacks, so every consumer matches on the variant.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "catalog_type")]
pub enum Product {
    #[serde(rename = "modules")]
    Module(ModuleProduct),
    #[serde(rename = "displays")]
    Display(DisplayProduct),
}

impl Product {
    pub fn catalog_type(&self) -> CatalogType {
        match self {
            Product::Module(_) => CatalogType::Modules,
            Product::Display(_) => CatalogType::Displays,
        }
    }

    pub fn id(&self) -> &str {
        match self {
            Product::Module(m) => &m.id,
            Product::Display(d) => &d.id,
        }
    }

    pub fn name(&self) -> &str {
        match self {
            Product::Module(m) => &m.name,
            Product::Display(d) => &d.name,
        }
    }

    pub fn environment(&self) -> Environment {
        match self {
            Product::Module(m) => m.environment,
            Product::Display(d) => d.environment,
        }
    }

    pub fn pitch_mm(&self) -> f64 {
        match self {
            Product::Module(m) => m.pitch_mm,
            Product::Display(d) => d.pitch_mm,
        }
    }

    pub fn price_rub(&self) -> Option<Decimal> {
        match self {
            Product::Module(m) => m.price_rub,
            Product::Display(d) => d.price_rub,
        }
    }

    pub fn availability(&self) -> Option<Availability> {
        match self {
            Product::Module(m) => m.availability,
            Product::Display(d) => d.availability,
        }
    }

    fn series(&self) -> Option<&str> {
        match self {
            Product::Module(m) => m.series.as_deref(),
            Product::Display(d) => d.series.as_deref(),
        }
    }

    fn refresh_hz(&self) -> Option<u32> {
        match self {
            Product::Module(m) => m.refresh_hz,
            Product::Display(d) => d.refresh_hz,
        }
    }

    fn size_mm(&self) -> Option<&str> {
        match self {
            Product::Module(m) => m.size_mm.as_deref(),
            Product::Display(d) => d.size_mm.as_deref(),
        }
    }

    fn badges(&self) -> &[String] {
        match self {
            Product::Module(m) => &m.badges,
            Product::Display(d) => &d.badges,
        }
    }

    /// Values this product exposes on a facet. Empty when the facet does not
    /// apply to the product's variant or the attribute is unset.
    pub fn facet_values(&self, facet: Facet) -> Vec<String> {
        let values: Vec<String> = match (self, facet) {
            (_, Facet::Environment) => vec![self.environment().as_str().to_string()],
            (_, Facet::Pitch) => vec![format_pitch(self.pitch_mm())],
            (_, Facet::RefreshRate) => self.refresh_hz().map(|hz| hz.to_string()).into_iter().collect(),
            (_, Facet::Size) => self.size_mm().map(str::to_string).into_iter().collect(),
            (_, Facet::Availability) => self
                .availability()
                .map(|a| a.as_str().to_string())
                .into_iter()
                .collect(),
            (_, Facet::Badges) => self.badges().to_vec(),
            (_, Facet::Series) => self.series().map(str::to_string).into_iter().collect(),

            (Product::Module(m), Facet::Flexibility) => {
                vec![if m.is_flexible { "yes" } else { "no" }.to_string()]
            }
            (Product::Module(m), Facet::Technology) => m.tech.clone(),
            (
                Product::Module(_),
                Facet::PixelType
                | Facet::ViewAngle
                | Facet::Brightness
                | Facet::IpRating
                | Facet::ScreenResolution,
            ) => Vec::new(),

            (Product::Display(_), Facet::Flexibility | Facet::Technology) => Vec::new(),
            (Product::Display(d), Facet::PixelType) => d.pixel_type.clone().into_iter().collect(),
            (Product::Display(d), Facet::ViewAngle) => d.view_angle.clone().into_iter().collect(),
            (Product::Display(d), Facet::Brightness) => d.brightness.clone().into_iter().collect(),
            (Product::Display(d), Facet::IpRating) => d.ip.clone().into_iter().collect(),
            (Product::Display(d), Facet::ScreenResolution) => {
                d.screen_resolution.clone().into_iter().collect()
            }
        };

        values.into_iter().filter(|v| !v.trim().is_empty()).collect()
    }

    /// Short technology line shown on a product card.
    pub fn tech_label(&self) -> String {
        match self {
            Product::Module(m) => m.tech.join(" / "),
            Product::Display(d) => d.pixel_type.clone().unwrap_or_default(),
        }
    }
}

/// `1.5 -> "1.5"`, `4.0 -> "4"`; the same text the catalog's query strings use.
pub fn format_pitch(pitch_mm: f64) -> String {
    format!("{pitch_mm}")
}

/// Catalog document as stored on disk.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CatalogCollection {
    #[serde(default)]
    pub modules: Vec<ModuleProduct>,
    #[serde(default)]
    pub displays: Vec<DisplayProduct>,
}

// =============================================================================
//  VIEWS (responses of /api/catalog)
// =============================================================================

#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CatalogItemView {
    #[schema(value_type = Object)]
    pub product: Product,
    #[schema(example = "18 900,00 ₽/шт")]
    pub price_label: String,
    #[schema(example = "В наличии")]
    pub availability_label: String,
    pub environment_label: String,
    pub tech_label: String,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct FacetValueView {
    pub value: String,
    pub label: String,
    pub selected: bool,
    /// Products of the partition carrying this value.
    pub count: usize,
    /// Canonical query string after toggling this value.
    pub toggle_query: String,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct FacetView {
    pub facet: Facet,
    pub key: String,
    pub title: String,
    pub values: Vec<FacetValueView>,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SortOptionView {
    pub value: SortMode,
    pub label: String,
    pub selected: bool,
    pub query: String,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PartitionView {
    pub catalog_type: CatalogType,
    pub label: String,
    pub selected: bool,
    pub total: usize,
    pub query: String,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CatalogView {
    pub catalog_type: CatalogType,
    pub sort: SortMode,
    pub total: usize,
    pub items: Vec<CatalogItemView>,
    pub facets: Vec<FacetView>,
    pub sort_options: Vec<SortOptionView>,
    pub partitions: Vec<PartitionView>,
    /// Canonical form of the request's own query string.
    pub query: String,
    pub reset_query: String,
    /// How clients apply the links above to browser history.
    #[schema(example = "replace")]
    pub navigation: String,
}
