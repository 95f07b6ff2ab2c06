//! Ready made context transforms for the transition table

use crate::common::Point2D;
use crate::mission_planning::context::StateMachineContext;

/// Context change applied when a transition fires
pub type ContextTransform = Box<dyn Fn(&mut StateMachineContext) + Send>;

pub fn identity() -> impl Fn(&mut StateMachineContext) + Send + 'static {
    |_: &mut StateMachineContext| {}
}

pub fn clear_obstacle() -> impl Fn(&mut StateMachineContext) + Send + 'static {
    |ctx: &mut StateMachineContext| ctx.clear_obstacle()
}

pub fn clear_target() -> impl Fn(&mut StateMachineContext) + Send + 'static {
    |ctx: &mut StateMachineContext| ctx.clear_target()
}

/// Uses the detected obstacle as the new target
pub fn target_from_obstacle() -> impl Fn(&mut StateMachineContext) + Send + 'static {
    |ctx: &mut StateMachineContext| match ctx.obstacle() {
        Some(obstacle) => ctx.set_target(obstacle),
        None => ctx.clear_target(),
    }
}

/// Drops the planned waypoints
pub fn reset_path() -> impl Fn(&mut StateMachineContext) + Send + 'static {
    |ctx: &mut StateMachineContext| ctx.clear_path()
}

pub fn set_target(target: Point2D) -> impl Fn(&mut StateMachineContext) + Send + 'static {
    move |ctx: &mut StateMachineContext| ctx.set_target(target)
}

/// Applies `first` then `second`
pub fn sequence<A, B>(first: A, second: B) -> impl Fn(&mut StateMachineContext) + Send + 'static
where
    A: Fn(&mut StateMachineContext) + Send + 'static,
    B: Fn(&mut StateMachineContext) + Send + 'static,
{
    move |ctx: &mut StateMachineContext| {
        first(ctx);
        second(ctx);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transforms() {
        let mut ctx = StateMachineContext::new();
        ctx.set_obstacle(Point2D::new(1.0, 2.0));
        ctx.set_path(vec![Point2D::origin()]);

        identity()(&mut ctx);
        assert_eq!(ctx.obstacle(), Some(Point2D::new(1.0, 2.0)));

        sequence(target_from_obstacle(), clear_obstacle())(&mut ctx);
        assert_eq!(ctx.target(), Some(Point2D::new(1.0, 2.0)));
        assert_eq!(ctx.obstacle(), None);

        target_from_obstacle()(&mut ctx);
        assert_eq!(ctx.target(), None);

        set_target(Point2D::new(3.0, 3.0))(&mut ctx);
        assert_eq!(ctx.target(), Some(Point2D::new(3.0, 3.0)));
        clear_target()(&mut ctx);
        assert_eq!(ctx.target(), None);

        reset_path()(&mut ctx);
        assert!(ctx.path().is_empty());
    }
}
