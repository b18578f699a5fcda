// Copyright 2025 coScene
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

// Food record entity and its validation rules

use std::fmt;
use thiserror::Error;

/// Number of positional fields a seed row must carry: id, name, protein, fat, carbs
pub const ROW_FIELDS: usize = 5;

/// Longest accepted id, in characters
pub const MAX_ID_LEN: usize = 255;

/// Field of a food record, in positional row order
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FoodField {
    Id,
    Name,
    Protein,
    Fat,
    Carbs,
}

impl FoodField {
    const ORDER: [FoodField; ROW_FIELDS] = [
        FoodField::Id,
        FoodField::Name,
        FoodField::Protein,
        FoodField::Fat,
        FoodField::Carbs,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            FoodField::Id => "id",
            FoodField::Name => "name",
            FoodField::Protein => "protein",
            FoodField::Fat => "fat",
            FoodField::Carbs => "carbs",
        }
    }
}

impl fmt::Display for FoodField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A field failed validation. `raw_value` is the input exactly as received.
#[derive(Debug, Clone, PartialEq, Error)]
#[error("invalid {field} value '{raw_value}': {reason}")]
pub struct ValidationError {
    pub field: FoodField,
    pub raw_value: String,
    pub reason: &'static str,
}

impl ValidationError {
    fn new(field: FoodField, raw_value: impl Into<String>, reason: &'static str) -> Self {
        Self {
            field,
            raw_value: raw_value.into(),
            reason,
        }
    }
}

/// A validated food item.
///
/// Fields are private so that every value reachable through the public API
/// has passed [`FoodItem::new`] or [`FoodItem::from_row`]. The `id` is the
/// natural key and never changes after construction.
#[derive(Debug, Clone, PartialEq)]
pub struct FoodItem {
    id: String,
    name: String,
    protein: f64,
    fat: f64,
    carbs: f64,
}

impl FoodItem {
    /// Build a record from typed values, applying the id and numeric rules
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        protein: f64,
        fat: f64,
        carbs: f64,
    ) -> Result<Self, ValidationError> {
        let id = validate_id(&id.into())?;
        Ok(Self {
            id,
            name: name.into().trim().to_string(),
            protein: check_amount(FoodField::Protein, protein)?,
            fat: check_amount(FoodField::Fat, fat)?,
            carbs: check_amount(FoodField::Carbs, carbs)?,
        })
    }

    /// Validate a raw positional row `[id, name, protein, fat, carbs, ..]`.
    ///
    /// Fields beyond the fifth are ignored. A short row fails on the first
    /// missing field with an empty raw value.
    pub fn from_row<S: AsRef<str>>(row: &[S]) -> Result<Self, ValidationError> {
        if row.len() < ROW_FIELDS {
            return Err(ValidationError::new(
                FoodField::ORDER[row.len()],
                "",
                "missing field",
            ));
        }

        let field = |i: usize| row[i].as_ref();

        Ok(Self {
            id: validate_id(field(0))?,
            name: field(1).trim().to_string(),
            protein: parse_amount(FoodField::Protein, field(2))?,
            fat: parse_amount(FoodField::Fat, field(3))?,
            carbs: parse_amount(FoodField::Carbs, field(4))?,
        })
    }

    /// Rebuild a record read back from a backend. Stored rows were validated
    /// on the way in, so no checks run here.
    pub(crate) fn from_stored(id: String, name: String, protein: f64, fat: f64, carbs: f64) -> Self {
        Self {
            id,
            name,
            protein,
            fat,
            carbs,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn protein(&self) -> f64 {
        self.protein
    }

    pub fn fat(&self) -> f64 {
        self.fat
    }

    pub fn carbs(&self) -> f64 {
        self.carbs
    }
}

/// Validate a lookup key. Returns the trimmed id.
pub fn validate_id(raw: &str) -> Result<String, ValidationError> {
    let id = raw.trim();
    if id.is_empty() {
        return Err(ValidationError::new(FoodField::Id, raw, "must not be empty"));
    }
    if id.chars().count() > MAX_ID_LEN {
        return Err(ValidationError::new(FoodField::Id, raw, "longer than 255 characters"));
    }
    Ok(id.to_string())
}

fn parse_amount(field: FoodField, raw: &str) -> Result<f64, ValidationError> {
    let value: f64 = raw
        .trim()
        .parse()
        .map_err(|_| ValidationError::new(field, raw, "not a decimal number"))?;
    check_amount(field, value).map_err(|mut e| {
        e.raw_value = raw.to_string();
        e
    })
}

fn check_amount(field: FoodField, value: f64) -> Result<f64, ValidationError> {
    if !value.is_finite() {
        return Err(ValidationError::new(field, value.to_string(), "must be finite"));
    }
    if value < 0.0 {
        return Err(ValidationError::new(field, value.to_string(), "must not be negative"));
    }
    Ok(value)
}
