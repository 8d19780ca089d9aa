mod registry;

pub use registry::StatusRegistry;

use serde::Serialize;
use std::fmt;

/// Prefix group of a status code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum StatusCategory {
    Chip,
    Map,
    Genotype,
}

impl StatusCategory {
    pub fn prefix(&self) -> &'static str {
        match self {
            StatusCategory::Chip => "c_",
            StatusCategory::Map => "m_",
            StatusCategory::Genotype => "g_",
        }
    }

    pub fn from_code(code: &str) -> Option<Self> {
        [StatusCategory::Chip, StatusCategory::Map, StatusCategory::Genotype]
            .into_iter()
            .find(|category| code.starts_with(category.prefix()) && code.len() > 2)
    }
}

impl fmt::Display for StatusCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            StatusCategory::Chip => "chip",
            StatusCategory::Map => "map",
            StatusCategory::Genotype => "genotype",
        })
    }
}

/// Every code the validation engine can emit.
#[allow(non_camel_case_types)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum StatusKey {
    c_A,
    c_B,
    m_A,
    m_B,
    m_C,
    m_D,
    m_E,
    m_F,
    g_A,
    g_B,
    g_C,
    g_D,
    g_E,
    g_F,
    g_G,
    g_H,
    g_I,
    g_K,
    g_L,
    g_M,
    g_N,
}

impl StatusKey {
    pub const ALL: [StatusKey; 21] = [
        StatusKey::c_A,
        StatusKey::c_B,
        StatusKey::m_A,
        StatusKey::m_B,
        StatusKey::m_C,
        StatusKey::m_D,
        StatusKey::m_E,
        StatusKey::m_F,
        StatusKey::g_A,
        StatusKey::g_B,
        StatusKey::g_C,
        StatusKey::g_D,
        StatusKey::g_E,
        StatusKey::g_F,
        StatusKey::g_G,
        StatusKey::g_H,
        StatusKey::g_I,
        StatusKey::g_K,
        StatusKey::g_L,
        StatusKey::g_M,
        StatusKey::g_N,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            StatusKey::c_A => "c_A",
            StatusKey::c_B => "c_B",
            StatusKey::m_A => "m_A",
            StatusKey::m_B => "m_B",
            StatusKey::m_C => "m_C",
            StatusKey::m_D => "m_D",
            StatusKey::m_E => "m_E",
            StatusKey::m_F => "m_F",
            StatusKey::g_A => "g_A",
            StatusKey::g_B => "g_B",
            StatusKey::g_C => "g_C",
            StatusKey::g_D => "g_D",
            StatusKey::g_E => "g_E",
            StatusKey::g_F => "g_F",
            StatusKey::g_G => "g_G",
            StatusKey::g_H => "g_H",
            StatusKey::g_I => "g_I",
            StatusKey::g_K => "g_K",
            StatusKey::g_L => "g_L",
            StatusKey::g_M => "g_M",
            StatusKey::g_N => "g_N",
        }
    }

    pub fn category(&self) -> StatusCategory {
        match self.as_str().as_bytes()[0] {
            b'c' => StatusCategory::Chip,
            b'm' => StatusCategory::Map,
            _ => StatusCategory::Genotype,
        }
    }

    fn ordinal(&self) -> usize {
        *self as usize
    }
}

impl fmt::Display for StatusKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One catalog entry: the display contract persisted next to each upload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StatusCode {
    pub category: StatusCategory,
    pub code: String,
    /// `bit_ok`
    pub success: bool,
    /// `bit_elaborato`
    pub processed: bool,
    pub message: String,
}

impl StatusCode {
    pub fn bit_ok(&self) -> u8 {
        self.success as u8
    }

    pub fn bit_elaborato(&self) -> u8 {
        self.processed as u8
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keys_are_listed_in_declaration_order() {
        for (idx, key) in StatusKey::ALL.iter().enumerate() {
            assert_eq!(key.ordinal(), idx, "{key} out of order");
        }
    }

    #[test]
    fn category_follows_prefix() {
        assert_eq!(StatusKey::c_B.category(), StatusCategory::Chip);
        assert_eq!(StatusKey::m_F.category(), StatusCategory::Map);
        assert_eq!(StatusKey::g_N.category(), StatusCategory::Genotype);
        assert_eq!(StatusCategory::from_code("g_Z"), Some(StatusCategory::Genotype));
        assert_eq!(StatusCategory::from_code("x_A"), None);
        assert_eq!(StatusCategory::from_code("m_"), None);
    }
}
