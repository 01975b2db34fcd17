use serde::{Deserialize, Serialize};

use crate::error::{MuniError, Result};

/// Governmental-accounting fund types. Every account belongs to exactly one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FundType {
    General,
    SpecialRevenue,
    CapitalProjects,
    DebtService,
    Enterprise,
    InternalService,
    Trust,
    Agency,
    ConservationTrust,
    Recreation,
    Utility,
}

/// GASB fund classification, derived from the fund type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FundClass {
    Governmental,
    Proprietary,
    Fiduciary,
}

impl FundType {
    pub fn class(&self) -> FundClass {
        match self {
            FundType::General
            | FundType::SpecialRevenue
            | FundType::CapitalProjects
            | FundType::DebtService => FundClass::Governmental,
            FundType::Enterprise
            | FundType::InternalService
            | FundType::Utility
            | FundType::Recreation => FundClass::Proprietary,
            FundType::Trust | FundType::Agency | FundType::ConservationTrust => {
                FundClass::Fiduciary
            }
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            FundType::General => "general",
            FundType::SpecialRevenue => "special_revenue",
            FundType::CapitalProjects => "capital_projects",
            FundType::DebtService => "debt_service",
            FundType::Enterprise => "enterprise",
            FundType::InternalService => "internal_service",
            FundType::Trust => "trust",
            FundType::Agency => "agency",
            FundType::ConservationTrust => "conservation_trust",
            FundType::Recreation => "recreation",
            FundType::Utility => "utility",
        }
    }

    pub fn parse(s: &str) -> Result<FundType> {
        match s {
            "general" => Ok(FundType::General),
            "special_revenue" => Ok(FundType::SpecialRevenue),
            "capital_projects" => Ok(FundType::CapitalProjects),
            "debt_service" => Ok(FundType::DebtService),
            "enterprise" => Ok(FundType::Enterprise),
            "internal_service" => Ok(FundType::InternalService),
            "trust" => Ok(FundType::Trust),
            "agency" => Ok(FundType::Agency),
            "conservation_trust" => Ok(FundType::ConservationTrust),
            "recreation" => Ok(FundType::Recreation),
            "utility" => Ok(FundType::Utility),
            other => Err(MuniError::UnknownFund(other.to_string())),
        }
    }
}

impl FundClass {
    pub fn as_str(&self) -> &'static str {
        match self {
            FundClass::Governmental => "governmental",
            FundClass::Proprietary => "proprietary",
            FundClass::Fiduciary => "fiduciary",
        }
    }

    pub fn parse(s: &str) -> Result<FundClass> {
        match s {
            "governmental" => Ok(FundClass::Governmental),
            "proprietary" => Ok(FundClass::Proprietary),
            "fiduciary" => Ok(FundClass::Fiduciary),
            other => Err(MuniError::UnknownFund(other.to_string())),
        }
    }
}

// Worksheet-name classification rules, first match wins. Tuned to the naming
// conventions seen on institutional budget workbooks; uppercased before match.
const WORKSHEET_FUND_RULES: &[(&str, FundType)] = &[
    ("SANITATION", FundType::Utility),
    ("WSD", FundType::Utility),
    ("WATER", FundType::Utility),
    ("SEWER", FundType::Utility),
    ("UTILITY", FundType::Utility),
    ("CON SUMM", FundType::ConservationTrust),
    ("CONSERVATION", FundType::ConservationTrust),
    ("RECREATION", FundType::Recreation),
    ("REC FUND", FundType::Recreation),
    ("DEBT", FundType::DebtService),
    ("CAPITAL", FundType::CapitalProjects),
    ("ENTERPRISE", FundType::Enterprise),
    ("INTERNAL", FundType::InternalService),
    ("AGENCY", FundType::Agency),
    ("TRUST", FundType::Trust),
    ("GRANT", FundType::SpecialRevenue),
    ("SPECIAL", FundType::SpecialRevenue),
    ("GENERAL", FundType::General),
];

/// Map a worksheet name to a fund type. Case-insensitive substring rules in
/// table order; `General` when nothing matches. Total — never fails.
pub fn classify_worksheet(name: &str) -> FundType {
    let upper = name.to_uppercase();
    for (keyword, fund) in WORKSHEET_FUND_RULES {
        if upper.contains(keyword) {
            return *fund;
        }
    }
    FundType::General
}
