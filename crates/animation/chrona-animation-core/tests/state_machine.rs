use std::cell::Cell;
use std::cell::RefCell;
use std::rc::Rc;

use chrona_animation_core::{
    ChangeMask, Config, ControlError, Direction, JobChangeListener, JobId, JobKind, JobState,
    Scheduler,
};
use chrona_test_fixtures::{CountingListener, OnFinished, OnStateChanged};

fn scheduler() -> Scheduler {
    Scheduler::new(Config::default())
}

#[test]
fn start_rewinds_forward_job_to_zero() {
    let mut sched = scheduler();
    let id = sched.add_job(JobKind::leaf(1000));
    sched.set_loop_count(id, 2);

    sched.set_current_time(id, 1500);
    assert_eq!(sched.job(id).unwrap().total_current_time(), 1500);

    sched.start(id);
    let job = sched.job(id).unwrap();
    assert_eq!(job.state(), JobState::Running);
    assert_eq!(job.total_current_time(), 0);
    assert_eq!(job.current_time(), 0);
    assert_eq!(job.current_loop(), 0);
}

#[test]
fn start_rewinds_backward_job_to_end() {
    let mut sched = scheduler();
    let id = sched.add_job(JobKind::leaf(1000));
    sched.set_loop_count(id, 2);
    sched.set_direction(id, Direction::Backward);

    sched.start(id);
    let job = sched.job(id).unwrap();
    assert_eq!(job.total_current_time(), 2000);
    assert_eq!(job.current_time(), 1000);
    assert_eq!(job.current_loop(), 1);
}

#[test]
fn start_rewinds_backward_infinite_job_to_one_loop() {
    let mut sched = scheduler();
    let id = sched.add_job(JobKind::leaf(1000));
    sched.set_loop_count(id, -1);
    sched.set_direction(id, Direction::Backward);

    sched.start(id);
    let job = sched.job(id).unwrap();
    assert_eq!(job.total_current_time(), 1000);
    assert_eq!(job.current_time(), 1000);
    assert_eq!(job.current_loop(), 0);
}

#[test]
fn zero_loop_count_job_never_leaves_stopped() {
    let mut sched = scheduler();
    let id = sched.add_job(JobKind::leaf(1000));
    sched.set_loop_count(id, 0);

    sched.start(id);
    assert_eq!(sched.job(id).unwrap().state(), JobState::Stopped);
    assert_eq!(sched.pause(id), Err(ControlError::PauseWhileStopped));
    assert_eq!(sched.resume(id), Err(ControlError::ResumeWhileNotPaused));
    sched.stop(id);
    sched.set_state(id, JobState::Running);
    assert_eq!(sched.job(id).unwrap().state(), JobState::Stopped);
}

#[test]
fn pause_stopped_and_resume_unpaused_are_errors() {
    let mut sched = scheduler();
    let id = sched.add_job(JobKind::leaf(1000));

    assert_eq!(sched.pause(id), Err(ControlError::PauseWhileStopped));
    assert_eq!(sched.job(id).unwrap().state(), JobState::Stopped);

    sched.start(id);
    assert_eq!(sched.resume(id), Err(ControlError::ResumeWhileNotPaused));
    assert_eq!(sched.job(id).unwrap().state(), JobState::Running);
}

#[test]
fn pause_freezes_time_until_resume() {
    let mut sched = scheduler();
    let id = sched.add_job(JobKind::leaf(1000));

    sched.start(id);
    sched.advance_time(300);
    assert_eq!(sched.job(id).unwrap().total_current_time(), 300);

    sched.pause(id).unwrap();
    sched.advance_time(500);
    let job = sched.job(id).unwrap();
    assert_eq!(job.state(), JobState::Paused);
    assert_eq!(job.total_current_time(), 300);

    sched.resume(id).unwrap();
    sched.advance_time(200);
    let job = sched.job(id).unwrap();
    assert_eq!(job.state(), JobState::Running);
    assert_eq!(job.total_current_time(), 500);
}

#[test]
fn natural_finish_fires_completion_once() {
    let mut sched = scheduler();
    let id = sched.add_job(JobKind::leaf(1000));
    sched.set_loop_count(id, 2);
    let listener = CountingListener::new();
    sched
        .add_change_listener(id, listener.clone(), ChangeMask::all())
        .unwrap();

    sched.start(id);
    sched.advance_time(1500);
    {
        let job = sched.job(id).unwrap();
        assert_eq!(job.current_loop(), 1);
        assert_eq!(job.current_time(), 500);
    }

    sched.advance_time(500);
    let job = sched.job(id).unwrap();
    assert_eq!(job.state(), JobState::Stopped);
    assert_eq!(job.total_current_time(), 2000);
    assert_eq!(job.current_time(), 1000);
    assert_eq!(job.current_loop(), 1);
    assert_eq!(listener.finished.get(), 1);
    assert_eq!(*listener.loop_changes.borrow(), vec![1]);
    assert_eq!(
        *listener.state_changes.borrow(),
        vec![
            (JobState::Running, JobState::Stopped),
            (JobState::Stopped, JobState::Running),
        ]
    );
}

#[test]
fn explicit_stop_midway_does_not_fire_completion() {
    let mut sched = scheduler();
    let id = sched.add_job(JobKind::leaf(1000));
    let listener = CountingListener::new();
    sched
        .add_change_listener(id, listener.clone(), ChangeMask::COMPLETION)
        .unwrap();

    sched.start(id);
    sched.advance_time(500);
    sched.stop(id);
    assert_eq!(sched.job(id).unwrap().state(), JobState::Stopped);
    assert_eq!(listener.finished.get(), 0);
}

#[test]
fn stopping_uncontrolled_job_fires_completion() {
    let mut sched = scheduler();
    let id = sched.add_job(JobKind::leaf(-1));
    let listener = CountingListener::new();
    sched
        .add_change_listener(id, listener.clone(), ChangeMask::COMPLETION)
        .unwrap();

    sched.start(id);
    sched.advance_time(700);
    assert_eq!(sched.job(id).unwrap().total_current_time(), 700);
    sched.stop(id);
    assert_eq!(listener.finished.get(), 1);
}

#[test]
fn stopping_infinite_loop_job_fires_completion() {
    let mut sched = scheduler();
    let id = sched.add_job(JobKind::leaf(100));
    sched.set_loop_count(id, -1);
    let listener = CountingListener::new();
    sched
        .add_change_listener(id, listener.clone(), ChangeMask::COMPLETION)
        .unwrap();

    sched.start(id);
    sched.advance_time(250);
    {
        let job = sched.job(id).unwrap();
        assert_eq!(job.current_loop(), 2);
        assert_eq!(job.current_time(), 50);
    }
    sched.stop(id);
    assert_eq!(listener.finished.get(), 1);
}

#[test]
fn listener_restopping_job_skips_secondary_effects() {
    let mut sched = scheduler();
    let id = sched.add_job(JobKind::leaf(1000));
    let hook_calls = Rc::new(Cell::new(0u32));
    let hook_calls2 = hook_calls.clone();
    sched
        .set_update_hook(id, move |_sched, _job, _time| {
            hook_calls2.set(hook_calls2.get() + 1);
        })
        .unwrap();
    let counting = CountingListener::new();
    sched
        .add_change_listener(id, counting.clone(), ChangeMask::STATE_CHANGE)
        .unwrap();
    let stopper = Rc::new(OnStateChanged(
        |sched: &mut Scheduler, job: JobId, new_state: JobState, _old: JobState| {
            if new_state == JobState::Running {
                sched.stop(job);
            }
        },
    ));
    sched
        .add_change_listener(id, stopper, ChangeMask::STATE_CHANGE)
        .unwrap();

    sched.start(id);
    // The re-entrant stop wins; the time re-apply of the interrupted start
    // must not run.
    assert_eq!(sched.job(id).unwrap().state(), JobState::Stopped);
    assert_eq!(hook_calls.get(), 0);
    assert_eq!(sched.pending_start_count(), 0);
    assert_eq!(
        *counting.state_changes.borrow(),
        vec![
            (JobState::Running, JobState::Stopped),
            (JobState::Stopped, JobState::Running),
        ]
    );
}

#[test]
fn listener_removing_job_during_completion_is_safe() {
    let mut sched = scheduler();
    let id = sched.add_job(JobKind::leaf(100));
    let remover = Rc::new(OnFinished(|sched: &mut Scheduler, job: JobId| {
        sched.remove_job(job);
    }));
    sched
        .add_change_listener(id, remover, ChangeMask::COMPLETION)
        .unwrap();

    sched.start(id);
    sched.advance_time(100);
    assert!(!sched.contains(id));
    assert_eq!(sched.running_job_count(), 0);
    assert_eq!(sched.running_leaf_count(), 0);
}

#[test]
fn listener_can_unsubscribe_itself() {
    let mut sched = scheduler();
    let id = sched.add_job(JobKind::leaf(1000));
    let calls = Rc::new(Cell::new(0u32));
    let calls2 = calls.clone();
    let slot: Rc<RefCell<Option<Rc<dyn JobChangeListener>>>> = Rc::new(RefCell::new(None));
    let slot2 = slot.clone();
    let listener: Rc<dyn JobChangeListener> = Rc::new(OnStateChanged(
        move |sched: &mut Scheduler, job: JobId, _new: JobState, _old: JobState| {
            calls2.set(calls2.get() + 1);
            let taken = slot2.borrow_mut().take();
            if let Some(l) = taken {
                assert!(sched.remove_change_listener(job, &l, ChangeMask::STATE_CHANGE));
            }
        },
    ));
    *slot.borrow_mut() = Some(listener.clone());
    sched
        .add_change_listener(id, listener, ChangeMask::STATE_CHANGE)
        .unwrap();

    sched.start(id);
    sched.stop(id);
    assert_eq!(calls.get(), 1);
}

#[test]
fn user_control_disabled_ignores_external_control() {
    let mut sched = scheduler();
    let id = sched.add_job(JobKind::leaf(1000));
    sched.set_user_control_disabled(id);

    let job = sched.job(id).unwrap();
    assert_eq!(job.state(), JobState::Paused);
    assert!(!job.is_registered());
    assert_eq!(sched.pending_start_count(), 0);
    assert_eq!(sched.running_leaf_count(), 0);

    sched.start(id);
    assert_eq!(sched.job(id).unwrap().state(), JobState::Paused);
    sched.stop(id);
    assert_eq!(sched.job(id).unwrap().state(), JobState::Paused);
    assert_eq!(sched.resume(id), Ok(()));
    assert_eq!(sched.job(id).unwrap().state(), JobState::Paused);

    // An external driver feeds it time directly; it still stops itself at
    // its natural end.
    sched.set_state(id, JobState::Running);
    sched.set_current_time(id, 600);
    assert_eq!(sched.job(id).unwrap().total_current_time(), 600);
    sched.set_current_time(id, 1000);
    assert_eq!(sched.job(id).unwrap().state(), JobState::Stopped);
}

#[test]
fn group_children_are_not_top_level() {
    let mut sched = scheduler();
    let group = sched.add_job(JobKind::group());
    let child = sched.add_job(JobKind::leaf(1000));
    sched.attach_to_group(child, group).unwrap();
    assert!(sched.is_top_level(group));
    assert!(sched.is_top_level(child));

    sched.start(group);
    assert!(!sched.is_top_level(child));

    sched.set_state(child, JobState::Running);
    sched.advance_time(0);
    // Only the group occupies a fan-out slot; the child is driven through
    // its parent but still counts as a running leaf.
    assert_eq!(sched.running_job_count(), 1);
    assert!(!sched.job(child).unwrap().is_registered());
    assert!(sched.job(group).unwrap().is_registered());
    assert_eq!(sched.running_leaf_count(), 1);
}

#[test]
fn attach_to_non_group_is_rejected() {
    let mut sched = scheduler();
    let leaf = sched.add_job(JobKind::leaf(100));
    let other = sched.add_job(JobKind::leaf(100));
    assert_eq!(
        sched.attach_to_group(other, leaf),
        Err(ControlError::NotAGroup)
    );
}

#[test]
fn removing_group_removes_children() {
    let mut sched = scheduler();
    let group = sched.add_job(JobKind::group());
    let a = sched.add_job(JobKind::leaf(100));
    let b = sched.add_job(JobKind::pause(100));
    sched.attach_to_group(a, group).unwrap();
    sched.attach_to_group(b, group).unwrap();

    assert!(sched.remove_job(group));
    assert!(!sched.contains(group));
    assert!(!sched.contains(a));
    assert!(!sched.contains(b));
    assert_eq!(sched.job_count(), 0);
}

#[test]
fn uncontrolled_child_finish_is_reported_to_group() {
    let mut sched = scheduler();
    let group = sched.add_job(JobKind::group());
    let child = sched.add_job(JobKind::leaf(-1));
    sched.attach_to_group(child, group).unwrap();

    // The parent stays stopped, so the child is top-level and schedulable.
    sched.start(child);
    sched.advance_time(400);
    sched.stop(child);

    let events = sched.take_events();
    assert_eq!(
        events,
        vec![chrona_animation_core::SchedulerEvent::UncontrolledFinished { group, job: child }]
    );
}

#[test]
fn removed_parent_reads_as_no_parent() {
    let mut sched = scheduler();
    let group = sched.add_job(JobKind::group());
    let child = sched.add_job(JobKind::leaf(100));
    sched.attach_to_group(child, group).unwrap();
    sched.detach_from_group(child);
    assert!(sched.remove_job(group));

    assert!(sched.contains(child));
    assert!(sched.is_top_level(child));
    assert_eq!(sched.job(child).unwrap().group(), None);
}
