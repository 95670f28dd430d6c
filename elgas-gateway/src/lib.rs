//! ELGAS2 call gateway
//!
//! Devices dial in over GPRS and announce themselves with a call to
//! dispatching. The gateway acknowledges the call, asks the metering backend
//! how the device should be read and then reads the device's archive over
//! the same connection.
//!
//! # TODO
//!
//! ## 呼叫处理
//! - [x] 连接监听和接受（每个连接一个任务）
//! - [x] CALL 确认（地址互换，空负载）
//! - [x] 读数设置查询（HTTP）
//! - [x] 标准时间窗口（去除夏令时偏移）
//! - [x] 分页读取归档（按时间，然后按记录号）
//! - [ ] 读取结果上传到后端

pub mod config;
pub mod context;
pub mod handler;
pub mod listener;
pub mod readout;
pub mod settings;
pub mod timewindow;

pub use config::GatewayConfig;
pub use context::SessionContext;
pub use handler::{CallHandler, CallOutcome, ElgasSessionFactory, SessionFactory, MAX_CALL_FRAME};
pub use listener::GatewayListener;
pub use readout::{read_archive, ArchiveReadout, ReadoutPlan};
pub use settings::{HttpSettingsProvider, ReadoutSettings, SettingsProvider};
pub use timewindow::{to_standard_time, ReadoutWindow};
