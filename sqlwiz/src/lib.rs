// Copyright 2026 The Sqlwiz Project
// SPDX-License-Identifier: Apache-2.0

pub mod client;
pub mod config;
pub mod config_path;
pub mod http;
pub mod normalize;
pub mod render;
pub mod stream;
pub mod upload;
