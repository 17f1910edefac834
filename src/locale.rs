//! Month-name tables and display strings.
//!
//! Both the period catalog and its inverse mapping go through the same
//! tables, so a label produced here always parses back to its key.

use serde::Deserialize;

use crate::models::{NpsCategory, YearMonth};

const MONTHS_PT: [&str; 12] = [
    "Janeiro", "Fevereiro", "Março", "Abril", "Maio", "Junho", "Julho", "Agosto", "Setembro",
    "Outubro", "Novembro", "Dezembro",
];

const MONTHS_PT_SHORT: [&str; 12] = [
    "Jan", "Fev", "Mar", "Abr", "Mai", "Jun", "Jul", "Ago", "Set", "Out", "Nov", "Dez",
];

const MONTHS_EN: [&str; 12] = [
    "January", "February", "March", "April", "May", "June", "July", "August", "September",
    "October", "November", "December",
];

const MONTHS_EN_SHORT: [&str; 12] = [
    "Jan", "Feb", "Mar", "Apr", "May", "Jun", "Jul", "Aug", "Sep", "Oct", "Nov", "Dec",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
pub enum Locale {
    #[default]
    #[serde(rename = "pt-BR")]
    PtBr,
    #[serde(rename = "en")]
    En,
}

impl Locale {
    fn months(self) -> &'static [&'static str; 12] {
        match self {
            Locale::PtBr => &MONTHS_PT,
            Locale::En => &MONTHS_EN,
        }
    }

    fn short_months(self) -> &'static [&'static str; 12] {
        match self {
            Locale::PtBr => &MONTHS_PT_SHORT,
            Locale::En => &MONTHS_EN_SHORT,
        }
    }

    pub fn month_name(self, month: u32) -> Option<&'static str> {
        let index = usize::try_from(month).ok()?.checked_sub(1)?;
        self.months().get(index).copied()
    }

    pub fn short_month_name(self, month: u32) -> Option<&'static str> {
        let index = usize::try_from(month).ok()?.checked_sub(1)?;
        self.short_months().get(index).copied()
    }

    /// Inverse of [`Locale::month_name`]; exact match only.
    pub fn month_number(self, name: &str) -> Option<u32> {
        self.months()
            .iter()
            .position(|candidate| *candidate == name)
            .map(|index| index as u32 + 1)
    }

    pub fn all_periods_label(self) -> &'static str {
        match self {
            Locale::PtBr => "Todos",
            Locale::En => "All",
        }
    }

    pub fn current_period_label(self) -> &'static str {
        match self {
            Locale::PtBr => "Atual",
            Locale::En => "Current",
        }
    }

    pub fn all_receptions_label(self) -> &'static str {
        match self {
            Locale::PtBr => "Todas",
            Locale::En => "All",
        }
    }

    /// `Março/2024`
    pub fn period_label(self, period: YearMonth) -> String {
        match self.month_name(period.month()) {
            Some(name) => format!("{}/{}", name, period.year()),
            None => format!("{:02}/{}", period.month(), period.year()),
        }
    }

    /// `Mar/24`
    pub fn short_period_label(self, period: YearMonth) -> String {
        let year = period.year().rem_euclid(100);
        match self.short_month_name(period.month()) {
            Some(name) => format!("{}/{:02}", name, year),
            None => format!("{:02}/{:02}", period.month(), year),
        }
    }

    pub fn category_label(self, category: NpsCategory) -> &'static str {
        match (self, category) {
            (Locale::PtBr, NpsCategory::Excellent) => "Excelente",
            (Locale::PtBr, NpsCategory::Good) => "Bom",
            (Locale::PtBr, NpsCategory::Regular) => "Regular",
            (Locale::PtBr, NpsCategory::Critical) => "Crítico",
            (Locale::En, NpsCategory::Excellent) => "Excellent",
            (Locale::En, NpsCategory::Good) => "Good",
            (Locale::En, NpsCategory::Regular) => "Regular",
            (Locale::En, NpsCategory::Critical) => "Critical",
        }
    }

    pub fn recommendation_headline(self, recommendation_mean: f64) -> &'static str {
        let most_recommend = recommendation_mean > 8.0;
        match (self, most_recommend) {
            (Locale::PtBr, true) => "A maioria dos pacientes recomendaria a clínica",
            (Locale::PtBr, false) => "Há oportunidades para melhorias",
            (Locale::En, true) => "Most patients would recommend the clinic",
            (Locale::En, false) => "There is room for improvement",
        }
    }

    pub fn all_periods_description(self) -> String {
        match self {
            Locale::PtBr => "Visualizando dados de todo o período".to_string(),
            Locale::En => "Showing data for the whole period".to_string(),
        }
    }

    pub fn current_period_description(self, current: YearMonth) -> String {
        let label = self.period_label(current);
        match self {
            Locale::PtBr => format!("Visualizando dados do mês atual ({label})"),
            Locale::En => format!("Showing data for the current month ({label})"),
        }
    }

    pub fn period_description(self, period: YearMonth) -> String {
        let label = self.period_label(period);
        match self {
            Locale::PtBr => format!("Visualizando dados de {label}"),
            Locale::En => format!("Showing data for {label}"),
        }
    }
}
