mod device;
mod scenario_spec;
