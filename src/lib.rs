//! Core of a single-device rotating pickup-sports queue: the event-sourced
//! rotation reducer, its invariant checker and undo history, the session
//! factory, and the persistence contract the presentation layer drives.

pub mod config;
pub mod dao;
pub mod dto;
pub mod error;
pub mod services;
pub mod state;
