//! Live face masking: camera frames in, frames with an overlay drawn over
//! each detected mouth out.
//!
//! Each bounded context keeps its traits and value types in `domain` and
//! the adapters that touch devices, files or threads in `infrastructure`.

pub mod capture {
    pub mod domain {
        pub mod camera_device;
        pub mod capture_device;
        pub mod capture_error;
        pub mod capture_format;
        pub mod frame_source;
    }
    pub mod infrastructure {
        pub mod ffmpeg_capture_device;
        pub mod system_device_catalog;
        pub mod threaded_frame_source;
    }
}

pub mod detection {
    pub mod domain {
        pub mod face_detector;
        pub mod face_feature;
    }
    pub mod infrastructure {
        pub mod cached_face_detector;
    }
}

pub mod compositing {
    pub mod domain {
        pub mod overlay_asset;
        pub mod overlay_compositor;
        pub mod overlay_placement;
    }
    pub mod infrastructure {
        pub mod cpu_overlay_compositor;
    }
}

pub mod presentation {
    pub mod domain {
        pub mod image_writer;
        pub mod presenter;
    }
    pub mod infrastructure {
        pub mod frame_sequence_presenter;
        pub mod image_file_writer;
        pub mod latest_image_presenter;
    }
    pub mod frame_dispatcher;
}

pub mod pipeline {
    pub mod masking_pipeline;
    pub mod pipeline_logger;
}

pub mod shared {
    pub mod asset_resolver;
    pub mod composited_image;
    pub mod constants;
    pub mod frame;
    pub mod geometry;
}
