mod mocks;

use mocks::{
    media_acquirer::MockMediaAcquirer,
    model::{MockModel, AGGREGATED_TEXT},
};
use std::{
    sync::{atomic::Ordering, Arc},
    time::Duration,
};
use video_digest::{
    stage::{StageKind, StageOutcome},
    StageErrorKind, VisualAnalyzer,
};

fn analyzer(model: MockModel, batch_size: usize) -> VisualAnalyzer<MockModel> {
    VisualAnalyzer::new(Arc::new(model)).with_batch_size(batch_size)
}

#[tokio::test(start_paused = true)]
async fn test_batches_are_dispatched_one_after_another() {
    for (frames, batch_size, expected_batches) in [(10, 4, 3), (8, 4, 2), (1, 4, 1), (5, 1, 5), (7, 10, 1)] {
        let model = MockModel::with_frame_delay(Duration::from_secs(1));
        let probe = model.clone();

        let outcome = analyzer(model, batch_size)
            .analyze(&MockMediaAcquirer::frame_paths(frames))
            .await;

        assert!(!outcome.is_degraded());
        assert_eq!(
            probe.dispatch_instants().len(),
            expected_batches,
            "{frames} frames with batch size {batch_size}"
        );
        assert!(probe.max_in_flight.load(Ordering::SeqCst) <= batch_size);
        assert_eq!(outcome.into_value().frame_count, frames);
    }
}

#[tokio::test(start_paused = true)]
async fn test_findings_keep_input_order_regardless_of_completion_order() {
    let frames = MockMediaAcquirer::frame_paths(8);
    let mut model = MockModel::default();
    // later frames in each batch finish first
    for (idx, frame) in frames.iter().enumerate() {
        let delay = Duration::from_millis(100 * (8 - idx as u64));
        model.frame_delays.insert(frame.clone(), delay);
    }

    let analysis = analyzer(model, 4).analyze(&frames).await.into_value();

    let paths = analysis
        .frame_details
        .iter()
        .map(|f| f.frame_path.clone())
        .collect::<Vec<_>>();
    assert_eq!(paths, frames);
    for finding in &analysis.frame_details {
        assert_eq!(finding.description, MockModel::description_for(&finding.frame_path));
    }
}

#[tokio::test]
async fn test_failing_frame_does_not_stop_the_rest() {
    let frames = MockMediaAcquirer::frame_paths(9);
    let mut model = MockModel::default();
    model.failing_frames.insert(frames[1].clone());
    let probe = model.clone();

    let analysis = analyzer(model, 4).analyze(&frames).await.into_value();

    assert_eq!(analysis.frame_count, 9);
    assert_eq!(probe.frame_calls.lock().unwrap().len(), 9);
    assert_eq!(analysis.frame_details[1].description, "");
    for (idx, finding) in analysis.frame_details.iter().enumerate() {
        if idx != 1 {
            assert!(!finding.description.is_empty(), "frame {idx} should be described");
        }
    }
    assert_eq!(analysis.summary, AGGREGATED_TEXT);

    let text_calls = probe.text_calls.lock().unwrap();
    assert_eq!(text_calls.len(), 1);
    assert!(!text_calls[0].user.contains("frame_00002.jpg"));
    assert!(text_calls[0].user.contains("frame_00003.jpg"));
}

#[tokio::test]
async fn test_all_frames_failing_degrades_and_skips_aggregation() {
    let frames = MockMediaAcquirer::frame_paths(3);
    let mut model = MockModel::default();
    model.failing_frames.extend(frames.iter().cloned());
    let probe = model.clone();

    let outcome = analyzer(model, 4).analyze(&frames).await;

    match &outcome {
        StageOutcome::Degraded { stage, kind, .. } => {
            assert_eq!(*stage, StageKind::VisualAnalysis);
            assert_eq!(*kind, StageErrorKind::Api);
        }
        StageOutcome::Completed(_) => panic!("no described frame should degrade the stage"),
    }
    let analysis = outcome.into_value();
    assert_eq!(analysis.frame_count, 3);
    assert_eq!(analysis.summary, "");
    assert!(analysis.frame_details.iter().all(|f| f.description.is_empty()));
    assert!(probe.text_calls.lock().unwrap().is_empty());
}

#[tokio::test]
async fn test_aggregation_failure_is_reported_as_degraded() {
    let frames = MockMediaAcquirer::frame_paths(5);
    let model = MockModel::failing_text("visual analysis of multiple video frames");

    let outcome = analyzer(model, 4).analyze(&frames).await;

    match &outcome {
        StageOutcome::Degraded { kind, .. } => assert_eq!(*kind, StageErrorKind::RateLimited),
        StageOutcome::Completed(_) => panic!("aggregation failure should degrade the stage"),
    }
    assert_eq!(outcome.into_value(), Default::default());
}

#[tokio::test]
async fn test_no_frames_means_no_model_calls() {
    let model = MockModel::default();
    let probe = model.clone();

    let outcome = analyzer(model, 4).analyze(&[]).await;

    assert_eq!(outcome, StageOutcome::Completed(Default::default()));
    assert!(probe.frame_calls.lock().unwrap().is_empty());
    assert!(probe.text_calls.lock().unwrap().is_empty());
}

#[test]
fn test_zero_batch_size_is_clamped() {
    assert_eq!(analyzer(MockModel::default(), 0).batch_size(), 1);
}
