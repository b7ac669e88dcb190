//! Sample monitoring files used across the test suite.
//!
//! The casts are short and hand-checked so tests can assert on exact
//! values: the CSV cast has five rows with depth 1..=5 m.

/// A short CTD cast exported as CSV.
pub const CTD_CAST_CSV: &str = "\
Depth,Temperature,Salinity,Oxygen
1.0,14.20,33.10,7.9
2.0,14.10,33.12,7.8
3.0,13.80,33.20,
4.0,13.10,33.41,7.1
5.0,12.60,33.52,6.8
";

/// The same kind of cast in Sea-Bird `.cnv` form, with one bad-flag cell.
pub const CTD_CAST_CNV: &str = "\
* Sea-Bird SBE 9 Data File:
* FileName = C:\\data\\stn04.hex
* System UTC = Jun 02 2024 10:15:22
** Station: STN-04
# nquan = 4
# nvalues = 4
# name 0 = prDM: Pressure, Digiquartz [db]
# name 1 = t090C: Temperature [ITS-90, deg C]
# name 2 = sal00: Salinity, Practical [PSU]
# name 3 = flag:  0.000e+00
# bad_flag = -9.990e-29
*END*
      1.000    15.1020    34.0100  0.000e+00
      2.000    15.0440    34.0120  0.000e+00
      3.000    14.8810 -9.990e-29  0.000e+00
      4.000    14.2030    34.0800  0.000e+00
";

/// Site metadata with one row that has no usable coordinates.
pub const SITE_METADATA_CSV: &str = "\
site_id,name,latitude,longitude,depth_m
STN-01,Harbour Mouth,-33.8568,151.2153,18
STN-02,Outer Reef,-33.9010,151.3020,42
STN-03,Broken Buoy,,151.3100,55
STN-04,Shelf Break,-34.0500,151.5000,120
";

/// Whitespace-delimited text export.
pub const CTD_CAST_TXT: &str = "\
depth temp sal
0.5   16.2 35.01
1.5   16.1 35.02
2.5   15.9 35.04
";

/// A script that echoes the data environment it was given.
pub const ECHO_ENV_SCRIPT: &str = "\
echo \"DATA_DIR=$DATA_DIR\"
echo \"DATA_FILE=$DATA_FILE\"
echo \"CTD_FILE=$CTD_FILE\"
echo \"SITE_FILE=$SITE_FILE\"
echo \"ARGS=$*\"
";

/// A script that writes to stderr and exits non-zero.
pub const FAILING_SCRIPT: &str = "\
echo \"partial output\"
echo \"Traceback: column 'Depth' missing\" 1>&2
exit 3
";
