//! Feature encoding for the loan approval classifier.
//!
//! The column order and the code tables below are the schema the deployed
//! artifact was trained against. Changing either one is a breaking change
//! that requires retraining the model.

use serde::Serialize;

use crate::errors::AppError;
use crate::models::LoanApplicationRequest;

/// Number of columns in a feature vector.
pub const FEATURE_COUNT: usize = 13;

/// Training-time column names, in feature vector order.
pub const FEATURE_COLUMNS: [&str; FEATURE_COUNT] = [
    "Age",
    "Dependents",
    "ApplicantIncome",
    "LoanAmount",
    "Cibil_Score",
    "Tenure",
    "Gender",
    "Married",
    "Education",
    "Self_Employed",
    "Previous_Loan_Taken",
    "Property_Area",
    "Customer_Bandwith",
];

/// A categorical form field with a fixed code table.
pub trait Category: Sized + Copy + 'static {
    /// Every variant, in code order.
    const ALL: &'static [Self];

    /// Numeric code fed to the classifier.
    fn code(self) -> u8;

    /// Canonical label as shown on the form and stored in the database.
    fn label(self) -> &'static str;

    /// Extra spellings accepted for this variant.
    fn aliases(self) -> &'static [&'static str] {
        &[]
    }

    /// Resolves a label. Values outside the domain are rejected, never defaulted.
    fn parse(field: &'static str, value: &str) -> Result<Self, AppError> {
        Self::ALL
            .iter()
            .copied()
            .find(|c| c.label() == value || c.aliases().contains(&value))
            .ok_or_else(|| AppError::UnknownCategory {
                field,
                value: value.to_string(),
            })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Gender {
    Male,
    Female,
}

impl Category for Gender {
    const ALL: &'static [Self] = &[Gender::Male, Gender::Female];

    fn code(self) -> u8 {
        match self {
            Gender::Male => 0,
            Gender::Female => 1,
        }
    }

    fn label(self) -> &'static str {
        match self {
            Gender::Male => "Male",
            Gender::Female => "Female",
        }
    }
}

/// Shared by `married`, `selfEmployed` and `previousLoanTaken`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum YesNo {
    No,
    Yes,
}

impl Category for YesNo {
    const ALL: &'static [Self] = &[YesNo::No, YesNo::Yes];

    fn code(self) -> u8 {
        match self {
            YesNo::No => 0,
            YesNo::Yes => 1,
        }
    }

    fn label(self) -> &'static str {
        match self {
            YesNo::No => "No",
            YesNo::Yes => "Yes",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Education {
    NotGraduate,
    Graduate,
}

impl Category for Education {
    const ALL: &'static [Self] = &[Education::NotGraduate, Education::Graduate];

    fn code(self) -> u8 {
        match self {
            Education::NotGraduate => 0,
            Education::Graduate => 1,
        }
    }

    fn label(self) -> &'static str {
        match self {
            Education::NotGraduate => "NotGraduate",
            Education::Graduate => "Graduate",
        }
    }

    fn aliases(self) -> &'static [&'static str] {
        match self {
            Education::NotGraduate => &["Not Graduate"],
            Education::Graduate => &[],
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PropertyArea {
    Rural,
    Semiurban,
    Urban,
}

impl Category for PropertyArea {
    const ALL: &'static [Self] = &[
        PropertyArea::Rural,
        PropertyArea::Semiurban,
        PropertyArea::Urban,
    ];

    fn code(self) -> u8 {
        match self {
            PropertyArea::Rural => 0,
            PropertyArea::Semiurban => 1,
            PropertyArea::Urban => 2,
        }
    }

    fn label(self) -> &'static str {
        match self {
            PropertyArea::Rural => "Rural",
            PropertyArea::Semiurban => "Semiurban",
            PropertyArea::Urban => "Urban",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CustomerBandwidth {
    Low,
    Medium,
    High,
}

impl Category for CustomerBandwidth {
    const ALL: &'static [Self] = &[
        CustomerBandwidth::Low,
        CustomerBandwidth::Medium,
        CustomerBandwidth::High,
    ];

    fn code(self) -> u8 {
        match self {
            CustomerBandwidth::Low => 0,
            CustomerBandwidth::Medium => 1,
            CustomerBandwidth::High => 2,
        }
    }

    fn label(self) -> &'static str {
        match self {
            CustomerBandwidth::Low => "Low",
            CustomerBandwidth::Medium => "Medium",
            CustomerBandwidth::High => "High",
        }
    }
}

/// Numeric row in [`FEATURE_COLUMNS`] order.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct FeatureVector([f64; FEATURE_COUNT]);

impl FeatureVector {
    pub fn new(values: [f64; FEATURE_COUNT]) -> Self {
        Self(values)
    }

    pub fn as_slice(&self) -> &[f64] {
        &self.0
    }

    /// Value for a training column name, if the name is part of the schema.
    pub fn column(&self, name: &str) -> Option<f64> {
        FEATURE_COLUMNS
            .iter()
            .position(|c| *c == name)
            .map(|i| self.0[i])
    }
}

/// Encodes a request into the classifier's feature vector.
///
/// Fails with `UnknownCategory` on the first categorical field whose value is
/// outside its table.
pub fn encode(request: &LoanApplicationRequest) -> Result<FeatureVector, AppError> {
    let gender = Gender::parse("gender", &request.gender)?;
    let married = YesNo::parse("married", &request.married)?;
    let education = Education::parse("education", &request.education)?;
    let self_employed = YesNo::parse("selfEmployed", &request.self_employed)?;
    let previous_loan = YesNo::parse("previousLoanTaken", &request.previous_loan_taken)?;
    let property_area = PropertyArea::parse("propertyArea", &request.property_area)?;
    let bandwidth = CustomerBandwidth::parse("customerBandwidth", &request.customer_bandwidth)?;

    Ok(FeatureVector([
        f64::from(request.age),
        f64::from(request.dependents),
        request.monthly_income,
        request.loan_amount,
        f64::from(request.credit_score),
        f64::from(request.tenure_months),
        f64::from(gender.code()),
        f64::from(married.code()),
        f64::from(education.code()),
        f64::from(self_employed.code()),
        f64::from(previous_loan.code()),
        f64::from(property_area.code()),
        f64::from(bandwidth.code()),
    ]))
}

/// One label→code pair of an encoding table.
#[derive(Debug, Clone, Serialize)]
pub struct CategoryCode {
    pub label: &'static str,
    pub code: u8,
}

/// Published form of one field's code table.
#[derive(Debug, Clone, Serialize)]
pub struct EncodingTable {
    /// Request field name.
    pub field: &'static str,
    /// Training column the code lands in.
    pub column: &'static str,
    pub codes: Vec<CategoryCode>,
}

fn table<C: Category>(field: &'static str, column: &'static str) -> EncodingTable {
    EncodingTable {
        field,
        column,
        codes: C::ALL
            .iter()
            .map(|c| CategoryCode {
                label: c.label(),
                code: c.code(),
            })
            .collect(),
    }
}

/// All categorical code tables, in feature vector order.
pub fn encoding_tables() -> Vec<EncodingTable> {
    vec![
        table::<Gender>("gender", "Gender"),
        table::<YesNo>("married", "Married"),
        table::<Education>("education", "Education"),
        table::<YesNo>("selfEmployed", "Self_Employed"),
        table::<YesNo>("previousLoanTaken", "Previous_Loan_Taken"),
        table::<PropertyArea>("propertyArea", "Property_Area"),
        table::<CustomerBandwidth>("customerBandwidth", "Customer_Bandwith"),
    ]
}
