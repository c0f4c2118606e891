// SPDX-FileCopyrightText: 2026 ArcheBase
//
// SPDX-License-Identifier: MulanPSL-2.0

//! Common utilities for integration tests.

#![allow(dead_code)]

use std::fs;
use std::io::{self, Cursor, Read, Write};
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use bddf::core::timestamp_to_nsec;
use bddf::encoding::GrpcMessage;
use bddf::DataReader;
use prost::Message;
use prost_reflect::{DescriptorPool, MessageDescriptor};
use prost_types::field_descriptor_proto::{Label, Type};
use prost_types::{
    DescriptorProto, FieldDescriptorProto, FileDescriptorProto, FileDescriptorSet, Timestamp,
};

// ============================================================================
// Temporary files
// ============================================================================

/// Get a unique temporary directory for test files
pub fn temp_dir(prefix: &str) -> PathBuf {
    let random = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap()
        .as_nanos();
    let thread_id = format!("{:?}", std::thread::current().id())
        .replace(|c: char| !c.is_ascii_alphanumeric(), "");
    std::env::temp_dir().join(format!(
        "bddf_{}_{}_{}_{}",
        prefix,
        std::process::id(),
        thread_id,
        random
    ))
}

/// Create a temporary file path with cleanup guard
pub fn temp_path(prefix: &str) -> (PathBuf, CleanupGuard) {
    let dir = temp_dir(prefix);
    fs::create_dir_all(&dir).ok();
    let path = dir.join("test.bddf");
    (path, CleanupGuard(dir))
}

/// Cleanup guard for test temporary files
#[derive(Debug)]
pub struct CleanupGuard(PathBuf);

impl Drop for CleanupGuard {
    fn drop(&mut self) {
        let _ = fs::remove_dir_all(&self.0);
    }
}

/// Open an in-memory file for random access.
pub fn open_bytes(bytes: Vec<u8>) -> DataReader<Cursor<Vec<u8>>> {
    DataReader::new(Cursor::new(bytes)).expect("valid BDDF bytes")
}

// ============================================================================
// Shared in-memory sink
// ============================================================================

#[derive(Debug, Default)]
struct SharedBytes {
    data: Vec<u8>,
    limit: Option<usize>,
}

/// In-memory sink that can be read while a writer still holds it.
///
/// With a limit set, writes beyond it fail the way a full disk does.
#[derive(Debug, Clone, Default)]
pub struct SharedBuffer {
    inner: Arc<Mutex<SharedBytes>>,
}

impl SharedBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Cap the total size; `None` removes the cap.
    pub fn set_limit(&self, limit: Option<usize>) {
        self.inner.lock().unwrap().limit = limit;
    }

    pub fn bytes(&self) -> Vec<u8> {
        self.inner.lock().unwrap().data.clone()
    }

    pub fn len(&self) -> usize {
        self.inner.lock().unwrap().data.len()
    }

    /// Reader that sees bytes appended after it was created.
    pub fn reader(&self) -> SharedReader {
        SharedReader {
            buffer: self.clone(),
            pos: 0,
        }
    }
}

impl Write for SharedBuffer {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let mut inner = self.inner.lock().unwrap();
        let room = match inner.limit {
            Some(limit) => limit.saturating_sub(inner.data.len()),
            None => buf.len(),
        };
        if room == 0 && !buf.is_empty() {
            return Err(io::Error::new(io::ErrorKind::Other, "disk full"));
        }
        let n = room.min(buf.len());
        inner.data.extend_from_slice(&buf[..n]);
        Ok(n)
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// Read side of a [`SharedBuffer`]; returns 0 at the current end.
#[derive(Debug)]
pub struct SharedReader {
    buffer: SharedBuffer,
    pos: usize,
}

impl Read for SharedReader {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let inner = self.buffer.inner.lock().unwrap();
        let n = buf.len().min(inner.data.len() - self.pos);
        buf[..n].copy_from_slice(&inner.data[self.pos..self.pos + n]);
        self.pos += n;
        Ok(n)
    }
}

// ============================================================================
// Test messages
// ============================================================================

/// A pose message with a generated type.
#[derive(Clone, PartialEq, Message)]
pub struct RobotPose {
    #[prost(string, tag = "1")]
    pub frame: String,
    #[prost(double, tag = "2")]
    pub x: f64,
    #[prost(double, tag = "3")]
    pub y: f64,
    #[prost(int64, tag = "4")]
    pub sequence: i64,
}

impl prost::Name for RobotPose {
    const NAME: &'static str = "RobotPose";
    const PACKAGE: &'static str = "bddf.test";
}

#[derive(Clone, PartialEq, Message)]
pub struct RequestHeader {
    #[prost(message, optional, tag = "1")]
    pub request_timestamp: Option<Timestamp>,
    #[prost(string, tag = "2")]
    pub client_name: String,
}

#[derive(Clone, PartialEq, Message)]
pub struct ResponseHeader {
    #[prost(message, optional, tag = "1")]
    pub request: Option<RequestHeader>,
    #[prost(message, optional, tag = "2")]
    pub response_timestamp: Option<Timestamp>,
}

#[derive(Clone, PartialEq, Message)]
pub struct GetRobotStateRequest {
    #[prost(message, optional, tag = "1")]
    pub header: Option<RequestHeader>,
}

impl prost::Name for GetRobotStateRequest {
    const NAME: &'static str = "GetRobotStateRequest";
    const PACKAGE: &'static str = "bddf.test";
}

impl GrpcMessage for GetRobotStateRequest {
    fn header_timestamp_nsec(&self) -> Option<i64> {
        self.header
            .as_ref()?
            .request_timestamp
            .as_ref()
            .map(timestamp_to_nsec)
    }
}

#[derive(Clone, PartialEq, Message)]
pub struct GetRobotStateResponse {
    #[prost(message, optional, tag = "1")]
    pub header: Option<ResponseHeader>,
    #[prost(double, tag = "2")]
    pub battery_percent: f64,
}

impl prost::Name for GetRobotStateResponse {
    const NAME: &'static str = "GetRobotStateResponse";
    const PACKAGE: &'static str = "bddf.test";
}

impl GrpcMessage for GetRobotStateResponse {
    fn header_timestamp_nsec(&self) -> Option<i64> {
        self.header
            .as_ref()?
            .response_timestamp
            .as_ref()
            .map(timestamp_to_nsec)
    }
}

/// A message type without a header timestamp.
#[derive(Clone, PartialEq, Message)]
pub struct Heartbeat {
    #[prost(uint64, tag = "1")]
    pub count: u64,
}

impl prost::Name for Heartbeat {
    const NAME: &'static str = "Heartbeat";
    const PACKAGE: &'static str = "bddf.test";
}

impl GrpcMessage for Heartbeat {}

// ============================================================================
// Runtime descriptors
// ============================================================================

fn field(name: &str, number: i32, ty: Type) -> FieldDescriptorProto {
    FieldDescriptorProto {
        name: Some(name.to_string()),
        number: Some(number),
        label: Some(Label::Optional as i32),
        r#type: Some(ty as i32),
        json_name: Some(name.to_string()),
        ..Default::default()
    }
}

/// `FileDescriptorSet` describing [`RobotPose`].
pub fn robot_pose_file_descriptor_set() -> FileDescriptorSet {
    FileDescriptorSet {
        file: vec![FileDescriptorProto {
            name: Some("bddf_test.proto".to_string()),
            package: Some("bddf.test".to_string()),
            message_type: vec![DescriptorProto {
                name: Some("RobotPose".to_string()),
                field: vec![
                    field("frame", 1, Type::String),
                    field("x", 2, Type::Double),
                    field("y", 3, Type::Double),
                    field("sequence", 4, Type::Int64),
                ],
                ..Default::default()
            }],
            syntax: Some("proto3".to_string()),
            ..Default::default()
        }],
    }
}

/// Runtime descriptor of [`RobotPose`].
pub fn robot_pose_descriptor() -> MessageDescriptor {
    DescriptorPool::from_file_descriptor_set(robot_pose_file_descriptor_set())
        .unwrap()
        .get_message_by_name("bddf.test.RobotPose")
        .unwrap()
}
