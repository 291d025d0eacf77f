use serde::Serialize;

use crate::error::DatapointsError;

/// Column positions in the Price Paid Data files.
pub mod columns {
    pub const ID: usize = 0;
    pub const PRICE: usize = 1;
    pub const DATE: usize = 2;
    pub const POSTCODE: usize = 3;
    pub const PROPERTY_TYPE: usize = 4;
    pub const NEW_BUILD: usize = 5;
    pub const ESTATE_TYPE: usize = 6;
    /// Primary addressable object name.
    pub const PAON: usize = 7;
    /// Secondary addressable object name.
    pub const SAON: usize = 8;
    pub const STREET: usize = 9;
    pub const LOCALITY: usize = 10;
    pub const TOWN: usize = 11;
    pub const DISTRICT: usize = 12;
    pub const COUNTY: usize = 13;
    pub const TRANSACTION: usize = 14;
    pub const RECORD_STATUS: usize = 15;

    pub const COUNT: usize = 16;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum PropertyType {
    Detached,
    SemiDetached,
    Terraced,
    Flat,
    Other,
}

impl PropertyType {
    pub fn from_code(code: &str) -> Result<Self, DatapointsError> {
        match code {
            "D" => Ok(PropertyType::Detached),
            "S" => Ok(PropertyType::SemiDetached),
            "T" => Ok(PropertyType::Terraced),
            "F" => Ok(PropertyType::Flat),
            "O" => Ok(PropertyType::Other),
            other => Err(unknown("property type", other)),
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            PropertyType::Detached => "Detached",
            PropertyType::SemiDetached => "Semi-Detached",
            PropertyType::Terraced => "Terraced",
            PropertyType::Flat => "Flat/Maisonette",
            PropertyType::Other => "Other",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum EstateType {
    Freehold,
    Leasehold,
    Unknown,
}

impl EstateType {
    pub fn from_code(code: &str) -> Result<Self, DatapointsError> {
        match code {
            "F" => Ok(EstateType::Freehold),
            "L" => Ok(EstateType::Leasehold),
            "U" => Ok(EstateType::Unknown),
            other => Err(unknown("estate type", other)),
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            EstateType::Freehold => "Freehold",
            EstateType::Leasehold => "Leasehold",
            EstateType::Unknown => "Unknown",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum TransactionCategory {
    /// Single residential property sold for full market value to a private individual.
    Standard,
    /// Repossessions, buy-to-lets and transfers to non-private individuals.
    Additional,
}

impl TransactionCategory {
    pub fn from_code(code: &str) -> Result<Self, DatapointsError> {
        match code {
            "A" => Ok(TransactionCategory::Standard),
            "B" => Ok(TransactionCategory::Additional),
            other => Err(unknown("transaction category", other)),
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            TransactionCategory::Standard => "Standard price paid transaction",
            TransactionCategory::Additional => "Additional price paid transaction",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum RecordStatus {
    Added,
    Changed,
    Deleted,
}

impl RecordStatus {
    pub fn from_code(code: &str) -> Result<Self, DatapointsError> {
        match code {
            "A" => Ok(RecordStatus::Added),
            "C" => Ok(RecordStatus::Changed),
            "D" => Ok(RecordStatus::Deleted),
            other => Err(unknown("record status", other)),
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            RecordStatus::Added => "Added",
            RecordStatus::Changed => "Changed",
            RecordStatus::Deleted => "Deleted",
        }
    }
}

fn parse_new_build(code: &str) -> Result<bool, DatapointsError> {
    match code {
        "Y" => Ok(true),
        "N" => Ok(false),
        other => Err(unknown("new build flag", other)),
    }
}

fn unknown(field: &'static str, code: &str) -> DatapointsError {
    DatapointsError::UnknownCode {
        field,
        code: code.to_string(),
    }
}

/// One property sale from the Price Paid Data.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PricePaidRecord {
    pub transaction_id: String,
    pub price: u64,
    pub date: String,
    pub postcode: String,
    pub property_type: PropertyType,
    pub new_build: bool,
    pub estate_type: EstateType,
    pub paon: String,
    pub saon: String,
    pub street: String,
    pub locality: String,
    pub town: String,
    pub district: String,
    pub county: String,
    pub transaction: TransactionCategory,
    pub record_status: RecordStatus,
}

impl PricePaidRecord {
    /// Builds a record from the raw fields of one row; `line` labels errors.
    pub fn from_row<S: AsRef<str>>(line: u64, row: &[S]) -> Result<Self, DatapointsError> {
        if row.len() != columns::COUNT {
            return Err(DatapointsError::MalformedRecord {
                line,
                expected: columns::COUNT,
                found: row.len(),
            });
        }
        let field = move |index: usize| row[index].as_ref().trim();
        let price = field(columns::PRICE)
            .parse::<u64>()
            .map_err(|_| DatapointsError::InvalidField {
                line,
                field: "price",
                value: field(columns::PRICE).to_string(),
            })?;

        Ok(Self {
            transaction_id: field(columns::ID).to_string(),
            price,
            date: field(columns::DATE).to_string(),
            postcode: field(columns::POSTCODE).to_string(),
            property_type: PropertyType::from_code(field(columns::PROPERTY_TYPE))?,
            new_build: parse_new_build(field(columns::NEW_BUILD))?,
            estate_type: EstateType::from_code(field(columns::ESTATE_TYPE))?,
            paon: field(columns::PAON).to_string(),
            saon: field(columns::SAON).to_string(),
            street: field(columns::STREET).to_string(),
            locality: field(columns::LOCALITY).to_string(),
            town: field(columns::TOWN).to_string(),
            district: field(columns::DISTRICT).to_string(),
            county: field(columns::COUNTY).to_string(),
            transaction: TransactionCategory::from_code(field(columns::TRANSACTION))?,
            record_status: RecordStatus::from_code(field(columns::RECORD_STATUS))?,
        })
    }

    pub fn formatted_price(&self) -> String {
        format_price(self.price)
    }

    /// `"{PAON} {STREET} ({SAON})"`, leaving out blank parts.
    pub fn address(&self) -> String {
        let mut address = self.paon.clone();
        if !self.street.is_empty() {
            address.push(' ');
            address.push_str(&self.street);
        }
        if !self.saon.is_empty() {
            address.push_str(&format!(" ({})", self.saon));
        }
        address
    }

    /// District, then town when it differs, then postcode (or county without one).
    pub fn area(&self) -> String {
        let mut area = self.district.clone();
        if area != self.town {
            area.push_str(&format!(", {}", self.town));
        }
        if !self.postcode.is_empty() {
            area.push_str(&format!(", {}", self.postcode));
        } else {
            area.push_str(&format!(", {}", self.county));
        }
        area
    }

    pub fn summary(&self) -> String {
        format!(
            "{}, {}, sold for £{}",
            self.address(),
            self.area(),
            self.formatted_price()
        )
    }
}

/// Millions with two decimals, thousands rounded, smaller amounts as is.
pub fn format_price(price: u64) -> String {
    if price >= 1_000_000 {
        format!("{:.2}m", price as f64 / 1_000_000.0)
    } else if price >= 1_000 {
        format!("{:.0}k", price as f64 / 1_000.0)
    } else {
        price.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn price_buckets() {
        assert_eq!(format_price(1_500_000), "1.50m");
        assert_eq!(format_price(250_000), "250k");
        assert_eq!(format_price(999), "999");
    }

    #[test]
    fn code_labels() {
        assert_eq!(PropertyType::from_code("F").unwrap().label(), "Flat/Maisonette");
        assert_eq!(EstateType::from_code("L").unwrap().label(), "Leasehold");
        assert_eq!(RecordStatus::from_code("D").unwrap().label(), "Deleted");
        assert!(parse_new_build("Y").unwrap());
    }
}
