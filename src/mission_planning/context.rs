//! Shared state machine context
//!
//! The context carries the few values every behavior agrees on (target,
//! obstacle, planned path, active state timing) as typed fields, and a
//! string keyed parameter map for per-state configuration overrides
//! (`"{stateName}.{param}"`).

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::common::Point2D;

/// Value of a context parameter
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ContextValue {
    Number(f64),
    Point(Point2D),
    Points(Vec<Point2D>),
    Text(String),
}

impl From<f64> for ContextValue {
    fn from(value: f64) -> Self {
        ContextValue::Number(value)
    }
}

impl From<i32> for ContextValue {
    fn from(value: i32) -> Self {
        ContextValue::Number(value as f64)
    }
}

impl From<u64> for ContextValue {
    fn from(value: u64) -> Self {
        ContextValue::Number(value as f64)
    }
}

impl From<Point2D> for ContextValue {
    fn from(value: Point2D) -> Self {
        ContextValue::Point(value)
    }
}

impl From<Vec<Point2D>> for ContextValue {
    fn from(value: Vec<Point2D>) -> Self {
        ContextValue::Points(value)
    }
}

impl From<&str> for ContextValue {
    fn from(value: &str) -> Self {
        ContextValue::Text(value.to_string())
    }
}

impl From<String> for ContextValue {
    fn from(value: String) -> Self {
        ContextValue::Text(value)
    }
}

/// Mutable context owned by the state machine engine
#[derive(Debug, Clone, Default)]
pub struct StateMachineContext {
    target: Option<Point2D>,
    obstacle: Option<Point2D>,
    path: Vec<Point2D>,
    path_index: usize,
    status_name: Option<String>,
    entry_time_ms: Option<u64>,
    timeout_ms: Option<u64>,
    params: HashMap<String, ContextValue>,
}

impl StateMachineContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn target(&self) -> Option<Point2D> {
        self.target
    }

    pub fn set_target(&mut self, target: Point2D) {
        self.target = Some(target);
    }

    pub fn clear_target(&mut self) {
        self.target = None;
    }

    pub fn obstacle(&self) -> Option<Point2D> {
        self.obstacle
    }

    pub fn set_obstacle(&mut self, obstacle: Point2D) {
        self.obstacle = Some(obstacle);
    }

    pub fn clear_obstacle(&mut self) {
        self.obstacle = None;
    }

    /// Planned waypoints
    pub fn path(&self) -> &[Point2D] {
        &self.path
    }

    /// Replaces the path and rewinds the waypoint cursor
    pub fn set_path(&mut self, path: Vec<Point2D>) {
        self.path = path;
        self.path_index = 0;
    }

    pub fn clear_path(&mut self) {
        self.set_path(Vec::new());
    }

    /// Index of the next waypoint to visit
    pub fn path_index(&self) -> usize {
        self.path_index
    }

    /// Next waypoint, advancing the cursor
    pub fn next_waypoint(&mut self) -> Option<Point2D> {
        let waypoint = self.path.get(self.path_index).copied()?;
        self.path_index += 1;
        Some(waypoint)
    }

    pub fn status_name(&self) -> Option<&str> {
        self.status_name.as_deref()
    }

    pub fn entry_time(&self) -> Option<u64> {
        self.entry_time_ms
    }

    pub fn timeout(&self) -> Option<u64> {
        self.timeout_ms
    }

    /// Records the activation of a state
    ///
    /// Resets the entry time and replaces the timeout.
    pub fn enter(&mut self, status_name: &str, now_ms: u64, timeout_ms: Option<u64>) {
        self.status_name = Some(status_name.to_string());
        self.entry_time_ms = Some(now_ms);
        self.timeout_ms = timeout_ms;
    }

    /// Time since the last activation [ms]
    pub fn elapsed(&self, now_ms: u64) -> Option<u64> {
        self.entry_time_ms.map(|entry| now_ms.saturating_sub(entry))
    }

    pub fn is_timer_expired(&self, now_ms: u64) -> bool {
        match (self.timeout_ms, self.elapsed(now_ms)) {
            (Some(timeout), Some(elapsed)) => elapsed >= timeout,
            _ => false,
        }
    }

    pub fn param(&self, key: &str) -> Option<&ContextValue> {
        self.params.get(key)
    }

    pub fn set_param(&mut self, key: &str, value: impl Into<ContextValue>) {
        self.params.insert(key.to_string(), value.into());
    }

    pub fn remove_param(&mut self, key: &str) -> Option<ContextValue> {
        self.params.remove(key)
    }

    pub fn number(&self, key: &str) -> Option<f64> {
        match self.params.get(key) {
            Some(ContextValue::Number(value)) => Some(*value),
            _ => None,
        }
    }

    pub fn point(&self, key: &str) -> Option<Point2D> {
        match self.params.get(key) {
            Some(ContextValue::Point(value)) => Some(*value),
            _ => None,
        }
    }

    pub fn points(&self, key: &str) -> Option<&[Point2D]> {
        match self.params.get(key) {
            Some(ContextValue::Points(value)) => Some(value),
            _ => None,
        }
    }

    pub fn text(&self, key: &str) -> Option<&str> {
        match self.params.get(key) {
            Some(ContextValue::Text(value)) => Some(value),
            _ => None,
        }
    }

    /// Numeric state parameter `"{state}.{param}"` or the default
    pub fn state_number(&self, state: &str, param: &str, default: f64) -> f64 {
        self.number(&state_key(state, param)).unwrap_or(default)
    }

    /// Duration state parameter [ms] or the default
    pub fn state_millis(&self, state: &str, param: &str, default: u64) -> u64 {
        self.number(&state_key(state, param))
            .map(|ms| ms.max(0.0).round() as u64)
            .unwrap_or(default)
    }

    pub fn state_point(&self, state: &str, param: &str) -> Option<Point2D> {
        self.point(&state_key(state, param))
    }

    /// State timeout `"{state}.timeout"` [ms] or the default
    pub fn state_timeout(&self, state: &str, default: Option<u64>) -> Option<u64> {
        self.number(&state_key(state, "timeout"))
            .map(|ms| ms.max(0.0).round() as u64)
            .or(default)
    }
}

/// Context key of a state parameter
pub fn state_key(state: &str, param: &str) -> String {
    format!("{}.{}", state, param)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_timer() {
        let mut ctx = StateMachineContext::new();
        assert!(!ctx.is_timer_expired(1000));

        ctx.enter("goto", 1000, Some(500));
        assert_eq!(ctx.status_name(), Some("goto"));
        assert_eq!(ctx.elapsed(1200), Some(200));
        assert!(!ctx.is_timer_expired(1499));
        assert!(ctx.is_timer_expired(1500));

        ctx.enter("scan", 2000, None);
        assert!(!ctx.is_timer_expired(100_000));
    }

    #[test]
    fn test_state_params() {
        let mut ctx = StateMachineContext::new();
        ctx.set_param("goto.distance", 0.5);
        ctx.set_param("goto.timeout", 3000);
        ctx.set_param("random.center", Point2D::new(1.0, 2.0));
        ctx.set_param("goto.label", "home");

        assert_eq!(ctx.state_number("goto", "distance", 0.2), 0.5);
        assert_eq!(ctx.state_number("goto", "speed", 1.0), 1.0);
        assert_eq!(ctx.state_timeout("goto", None), Some(3000));
        assert_eq!(ctx.state_timeout("scan", Some(10)), Some(10));
        assert_eq!(ctx.state_point("random", "center"), Some(Point2D::new(1.0, 2.0)));
        assert_eq!(ctx.text("goto.label"), Some("home"));
        // wrong type reads as missing
        assert_eq!(ctx.number("goto.label"), None);
    }

    #[test]
    fn test_path_cursor() {
        let mut ctx = StateMachineContext::new();
        ctx.set_path(vec![Point2D::new(1.0, 0.0), Point2D::new(2.0, 0.0)]);
        assert_eq!(ctx.next_waypoint(), Some(Point2D::new(1.0, 0.0)));
        assert_eq!(ctx.next_waypoint(), Some(Point2D::new(2.0, 0.0)));
        assert_eq!(ctx.next_waypoint(), None);
        assert_eq!(ctx.path_index(), 2);

        ctx.clear_path();
        assert!(ctx.path().is_empty());
        assert_eq!(ctx.path_index(), 0);
    }
}
