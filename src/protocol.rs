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

// Protobuf messages exchanged with remote callers
//
// Equivalent .proto:
//
//   message Food { string id = 1; string name = 2; double protein = 3;
//                  double fat = 4; double carbs = 5; }
//   message FoodRequest { Operation op = 1; string id = 2; Food food = 3; }
//   message FoodResponse { StatusCode status = 1; string message = 2;
//                          repeated Food foods = 3; }

use crate::record::FoodItem;

/// Remote operation selector
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, prost::Enumeration)]
#[repr(i32)]
pub enum Operation {
    Unspecified = 0,
    Create = 1,
    Get = 2,
    Update = 3,
    Delete = 4,
    List = 5,
}

/// Status taxonomy returned to callers. Values follow the gRPC status codes.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, prost::Enumeration)]
#[repr(i32)]
pub enum StatusCode {
    Ok = 0,
    InvalidArgument = 3,
    NotFound = 5,
    AlreadyExists = 6,
    Internal = 13,
}

/// Food record on the wire. Numeric fields are unvalidated until converted.
#[derive(Clone, PartialEq, prost::Message)]
pub struct FoodMessage {
    #[prost(string, tag = "1")]
    pub id: String,
    #[prost(string, tag = "2")]
    pub name: String,
    #[prost(double, tag = "3")]
    pub protein: f64,
    #[prost(double, tag = "4")]
    pub fat: f64,
    #[prost(double, tag = "5")]
    pub carbs: f64,
}

#[derive(Clone, PartialEq, prost::Message)]
pub struct FoodRequest {
    #[prost(enumeration = "Operation", tag = "1")]
    pub op: i32,
    /// Lookup key for get and delete
    #[prost(string, tag = "2")]
    pub id: String,
    /// Payload for create and update
    #[prost(message, optional, tag = "3")]
    pub food: Option<FoodMessage>,
}

#[derive(Clone, PartialEq, prost::Message)]
pub struct FoodResponse {
    #[prost(enumeration = "StatusCode", tag = "1")]
    pub status: i32,
    #[prost(string, tag = "2")]
    pub message: String,
    /// One entry for create, get and update; every record for list; empty otherwise
    #[prost(message, repeated, tag = "3")]
    pub foods: Vec<FoodMessage>,
}

impl From<&FoodItem> for FoodMessage {
    fn from(food: &FoodItem) -> Self {
        Self {
            id: food.id().to_string(),
            name: food.name().to_string(),
            protein: food.protein(),
            fat: food.fat(),
            carbs: food.carbs(),
        }
    }
}

impl From<FoodItem> for FoodMessage {
    fn from(food: FoodItem) -> Self {
        Self::from(&food)
    }
}

impl FoodRequest {
    pub fn create(food: FoodMessage) -> Self {
        Self {
            op: Operation::Create as i32,
            id: String::new(),
            food: Some(food),
        }
    }

    pub fn get(id: impl Into<String>) -> Self {
        Self {
            op: Operation::Get as i32,
            id: id.into(),
            food: None,
        }
    }

    pub fn update(food: FoodMessage) -> Self {
        Self {
            op: Operation::Update as i32,
            id: String::new(),
            food: Some(food),
        }
    }

    pub fn delete(id: impl Into<String>) -> Self {
        Self {
            op: Operation::Delete as i32,
            id: id.into(),
            food: None,
        }
    }

    pub fn list() -> Self {
        Self {
            op: Operation::List as i32,
            id: String::new(),
            food: None,
        }
    }
}

impl FoodResponse {
    pub fn ok(foods: Vec<FoodMessage>) -> Self {
        Self {
            status: StatusCode::Ok as i32,
            message: "Operation completed successfully".to_string(),
            foods,
        }
    }

    pub fn error(code: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status: code as i32,
            message: message.into(),
            foods: Vec::new(),
        }
    }

    /// Decoded status; unknown values read as `Internal`
    pub fn status_code(&self) -> StatusCode {
        StatusCode::try_from(self.status).unwrap_or(StatusCode::Internal)
    }
}
