use tandem::property::{POSITION, ROTATION};
use tandem::{EntityId, Presenter, PropertyValue};

/// Presentation layer of a headless host: every applied value becomes a log line.
#[derive(Debug, Default)]
pub struct LogPresenter {
    applied: u64,
}

impl LogPresenter {
    pub fn applied(&self) -> u64 {
        self.applied
    }
}

impl Presenter for LogPresenter {
    fn present(&mut self, entity: EntityId, key: &'static str, value: PropertyValue) {
        self.applied += 1;
        // poses change every frame while something moves
        if key == POSITION.name() || key == ROTATION.name() {
            log::debug!("{} {} = {:?}", entity, key, value);
        } else {
            log::info!("{} {} = {:?}", entity, key, value);
        }
    }

    fn forget(&mut self, entity: EntityId) {
        log::info!("{} removed from presentation", entity);
    }
}
