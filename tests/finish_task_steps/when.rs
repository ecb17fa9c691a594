//! When steps for finish-task BDD scenarios.

use super::world::{FinishTaskWorld, run_async};
use rstest_bdd_macros::when;

#[when("the task is finished")]
fn task_is_finished(world: &mut FinishTaskWorld) {
    let pipeline = world.pipeline();
    let result = run_async(pipeline.run(&mut world.log));
    world.result = Some(result);
}
