//! Hand-maintained schema for the embedded acquisition catalog.

diesel::table! {
    files (id) {
        id -> Text,
        directory -> Text,
        track -> Integer,
        orbit_direction -> Text,
        swath -> Integer,
        pol -> Text,
        date -> Date,
    }
}

diesel::table! {
    bursts (id) {
        id -> Text,
        track -> Integer,
        orbit_direction -> Text,
        swath -> Integer,
        burstid -> Integer,
        center_lat -> Double,
        center_lon -> Double,
        corner1_lat -> Double,
        corner1_lon -> Double,
        corner2_lat -> Double,
        corner2_lon -> Double,
        corner3_lat -> Double,
        corner3_lon -> Double,
        corner4_lat -> Double,
        corner4_lon -> Double,
    }
}

diesel::table! {
    files_bursts (file_id, burst_id, burst_no) {
        file_id -> Text,
        burst_id -> Text,
        burst_no -> Integer,
    }
}

diesel::table! {
    porbits (id) {
        id -> Text,
        directory -> Text,
        begintime -> Timestamp,
        endtime -> Timestamp,
    }
}

diesel::table! {
    rorbits (id) {
        id -> Text,
        directory -> Text,
        begintime -> Timestamp,
        endtime -> Timestamp,
    }
}

diesel::joinable!(files_bursts -> files (file_id));
diesel::joinable!(files_bursts -> bursts (burst_id));

diesel::allow_tables_to_appear_in_same_query!(files, bursts, files_bursts);
