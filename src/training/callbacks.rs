use slog::Logger;

use crate::training::{Callback, TrainingInfo};

/// Logs the loss and error rate of every training pass and the attachment scores of
/// every validation pass. A validation LAS above the best so far is reported as a
/// save point.
#[derive(Debug)]
pub struct Reporter {
    logger: Logger,
    best_las: Option<f64>,
    best_epoch: Option<u32>,
}

impl Reporter {
    pub fn new(logger: Logger) -> Self {
        Reporter {
            logger,
            best_las: None,
            best_epoch: None,
        }
    }

    pub fn best_las(&self) -> Option<f64> {
        self.best_las
    }

    pub fn best_epoch(&self) -> Option<u32> {
        self.best_epoch
    }

    fn update_best(&mut self, epoch: u32, las: f64) -> bool {
        match self.best_las {
            Some(best) if las <= best => false,
            _ => {
                self.best_las = Some(las);
                self.best_epoch = Some(epoch);
                true
            }
        }
    }
}

impl Callback for Reporter {
    fn on_epoch_train_end(&mut self, info: &TrainingInfo) {
        match info.error_rate() {
            Some(rate) => {
                info!(
                    self.logger,
                    "[training] epoch {} - #samples: {}, loss: {:.8}, error rate: {:.8}",
                    info.epoch,
                    info.data_size,
                    info.loss.unwrap_or(0.0),
                    rate
                );
            }
            None => {
                info!(
                    self.logger,
                    "[training] epoch {} - #samples: {}, loss: {:.8}, error rate: NaN",
                    info.epoch,
                    info.data_size,
                    info.loss.unwrap_or(0.0)
                );
            }
        }
    }

    fn on_epoch_validate_end(&mut self, info: &TrainingInfo) {
        let scores = match info.scores {
            Some(ref scores) => scores,
            None => return,
        };
        info!(
            self.logger,
            "[validation] epoch {} - #samples: {}, UAS: {:.2}, LAS: {:.2}, LS: {:.2}",
            info.epoch,
            info.data_size,
            scores.uas(),
            scores.las(),
            scores.ls()
        );
        if self.update_best(info.epoch, scores.las()) {
            info!(
                self.logger,
                "[validation] epoch {} - LAS improved to {:.2}, save point",
                info.epoch,
                scores.las()
            );
        }
    }
}
