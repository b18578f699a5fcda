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

// Zenoh queryable serving protobuf food requests

use anyhow::{anyhow, Result};
use prost::Message;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};
use zenoh::query::Query;
use zenoh::Session;

use crate::protocol::{FoodRequest, FoodResponse, Operation, StatusCode};
use crate::service::{FoodService, Status};

/// Serves the food service over a Zenoh queryable.
///
/// Requests and replies are protobuf-encoded [`FoodRequest`] and
/// [`FoodResponse`] messages. Every query runs on its own task, so a slow
/// backend call never holds up other callers.
pub struct RpcServer {
    session: Session,
    service: FoodService,
    key_expr: String,
}

impl RpcServer {
    pub fn new(session: Session, service: FoodService, key_expr: String) -> Self {
        Self {
            session,
            service,
            key_expr,
        }
    }

    /// Serve until `shutdown` fires, then stop taking queries and wait for
    /// the ones already accepted to be answered.
    pub async fn run(&self, shutdown: CancellationToken) -> Result<()> {
        let queryable = self
            .session
            .declare_queryable(self.key_expr.as_str())
            .await
            .map_err(|e| anyhow!("{}", e))?;

        info!("Food service listening on '{}'", self.key_expr);

        let mut in_flight = JoinSet::new();

        loop {
            tokio::select! {
                _ = shutdown.cancelled() => break,
                query = queryable.recv_async() => {
                    let query = match query {
                        Ok(query) => query,
                        Err(e) => {
                            warn!("Queryable closed: {}", e);
                            break;
                        }
                    };
                    let service = self.service.clone();
                    in_flight.spawn(async move {
                        if let Err(e) = Self::handle_query(query, service).await {
                            error!("Error handling food query: {}", e);
                        }
                    });
                }
                Some(_) = in_flight.join_next(), if !in_flight.is_empty() => {}
            }
        }

        drop(queryable);
        info!(
            "Stopped accepting food queries, waiting for {} in flight",
            in_flight.len()
        );
        while in_flight.join_next().await.is_some() {}

        Ok(())
    }

    async fn handle_query(query: Query, service: FoodService) -> Result<()> {
        debug!("Received food query on '{}'", query.selector());

        let request = query
            .payload()
            .map(|payload| FoodRequest::decode(payload.to_bytes().as_ref()));

        let response = match request {
            Some(Ok(request)) => dispatch(&service, request).await,
            Some(Err(e)) => FoodResponse::error(
                StatusCode::InvalidArgument,
                format!("Malformed request payload: {}", e),
            ),
            None => FoodResponse::error(StatusCode::InvalidArgument, "Missing request payload"),
        };

        query
            .reply(query.key_expr().clone(), response.encode_to_vec())
            .await
            .map_err(|e| anyhow!("{}", e))?;

        Ok(())
    }
}

/// Run one request against the service and build its reply
pub async fn dispatch(service: &FoodService, request: FoodRequest) -> FoodResponse {
    let result = match Operation::try_from(request.op) {
        Ok(Operation::Create) => match request.food {
            Some(food) => service.create_food(food).await.map(|food| vec![food]),
            None => Err(missing_food()),
        },
        Ok(Operation::Get) => service.get_food(&request.id).await.map(|food| vec![food]),
        Ok(Operation::Update) => match request.food {
            Some(food) => service.update_food(food).await.map(|food| vec![food]),
            None => Err(missing_food()),
        },
        Ok(Operation::Delete) => service.delete_food(&request.id).await.map(|()| Vec::new()),
        Ok(Operation::List) => service.list_foods().await,
        Ok(Operation::Unspecified) | Err(_) => Err(Status::new(
            StatusCode::InvalidArgument,
            format!("Unknown operation: {}", request.op),
        )),
    };

    match result {
        Ok(foods) => FoodResponse::ok(foods),
        Err(status) => FoodResponse::error(status.code, status.message),
    }
}

fn missing_food() -> Status {
    Status::new(StatusCode::InvalidArgument, "Request is missing the food payload")
}
