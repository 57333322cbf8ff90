use tandem::SimulationConfig;

#[derive(Debug, Clone)]
pub struct HostConfig {
    pub simulation: SimulationConfig,
    pub present_rate: u32,
    /// Wall-clock limit; the host also stops once the session outcome latches.
    pub duration_secs: f32,
    pub canvas_count: usize,
}

impl Default for HostConfig {
    fn default() -> Self {
        Self {
            simulation: SimulationConfig {
                countdown_secs: 30.0,
                ..Default::default()
            },
            present_rate: 30,
            duration_secs: 20.0,
            canvas_count: 4,
        }
    }
}
