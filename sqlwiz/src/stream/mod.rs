// Copyright 2026 The Sqlwiz Project
// SPDX-License-Identifier: Apache-2.0

// Sentinel-framed response streams
//
// Responsibilities:
// - Decode body bytes to text, keeping split multi-byte characters intact
// - Split the text into sql / result / error sections on in-band markers
// - Tolerate markers split across arbitrary read boundaries
// - Report section appends and state transitions as they happen
//
// Wire contract: `<sql>--SQL-END--<result>[--ERROR--<error>]`, or
// `[<partial sql>]--ERROR--<error>` when SQL generation itself fails.

mod decoder;
mod demux;
mod types;

pub use decoder::Utf8Decoder;
pub use demux::Demultiplexer;
pub use types::{
    DemuxEvent, Marker, ParserState, SectionKind, Sections, ERROR_START, SQL_END,
};
